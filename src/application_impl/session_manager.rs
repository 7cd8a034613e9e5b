use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use crate::logger::*;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use serde::Deserialize;
use serde_json::json;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type PendingRefresh = Shared<BoxFuture<'static, bool>>;

#[derive(Debug, Deserialize)]
struct TokenPairResponse {
    access: String,
    refresh: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
}

struct Inner {
    transport: Arc<dyn HttpTransport>,
    store: Arc<dyn TokenStore>,
    navigator: Arc<dyn Navigator>,
    endpoints: AuthEndpoints,
    public_paths: PublicPaths,
    session: Mutex<Session>,
    pending_refresh: Mutex<Option<PendingRefresh>>,
    /// Held across every store write so storage follows memory in order.
    persist: tokio::sync::Mutex<()>,
}

/// Owns the token pair and role. Clones share the same session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
        endpoints: AuthEndpoints,
        public_paths: PublicPaths,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                store,
                navigator,
                endpoints,
                public_paths,
                session: Mutex::new(Session::default()),
                pending_refresh: Mutex::new(None),
                persist: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Builds a manager hydrated from durable storage. A corrupt store is
    /// discarded and the session starts empty.
    pub async fn restore(
        transport: Arc<dyn HttpTransport>,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
        endpoints: AuthEndpoints,
        public_paths: PublicPaths,
    ) -> Result<Self, AuthError> {
        let stored = match store.load().await {
            Ok(stored) => stored,
            Err(StoreError::Corrupt(e)) => {
                warn!(error = %e, "discarding unreadable token storage");
                store.clear().await?;
                StoredTokens::default()
            }
            Err(e) => return Err(e.into()),
        };
        let manager = Self::new(transport, store, navigator, endpoints, public_paths);
        *manager.inner.lock_session() = Session::from_stored(stored);
        debug!(
            authenticated = manager.inner.lock_session().is_authenticated(),
            "session restored"
        );
        Ok(manager)
    }

    fn access_token(&self) -> Option<AccessToken> {
        self.inner.lock_session().access_token.clone()
    }

    async fn dispatch(
        &self,
        endpoint: &Endpoint,
        options: &RequestOptions,
        token: Option<&AccessToken>,
    ) -> Result<HttpResponse, RequestError> {
        let request = HttpRequest::new(endpoint)
            .with_options(options)
            .with_bearer(token.map(AccessToken::as_str));
        Ok(self.inner.transport.send(request).await?)
    }
}

impl Inner {
    fn lock_session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_pending(&self) -> MutexGuard<'_, Option<PendingRefresh>> {
        self.pending_refresh
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn clear(&self) {
        let _persist = self.persist.lock().await;
        self.clear_locked().await;
    }

    async fn clear_locked(&self) {
        self.lock_session().clear();
        if let Err(e) = self.store.clear().await {
            warn!(error = %e, "could not clear token storage");
        }
    }

    /// Clears only if the session still holds `refresh`, so a login that
    /// landed in the meantime survives.
    async fn clear_if_current(&self, refresh: Option<&RefreshToken>) {
        let _persist = self.persist.lock().await;
        let unchanged = self.lock_session().refresh_token.as_ref() == refresh;
        if unchanged {
            self.clear_locked().await;
        }
    }

    async fn run_refresh(&self) -> bool {
        let Some(refresh) = self.lock_session().refresh_token.clone() else {
            debug!("no refresh token, skipping refresh");
            return false;
        };

        let request = HttpRequest::new(&Endpoint::post(self.endpoints.token_refresh.as_str()))
            .with_body(json!({ "refresh": refresh.as_str() }));
        let resp = match self.transport.send(request).await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, "token refresh failed");
                return false;
            }
        };
        if !resp.is_success() {
            warn!(status = resp.status, "token refresh rejected");
            return false;
        }
        let access = match resp.json::<RefreshResponse>() {
            Ok(body) => body.access,
            Err(e) => {
                warn!(error = %e, "token refresh returned an unreadable body");
                return false;
            }
        };

        let _persist = self.persist.lock().await;
        let stored = {
            let mut session = self.lock_session();
            if session.refresh_token.as_ref() != Some(&refresh) {
                debug!("session replaced during refresh, dropping refreshed token");
                return session.access_token.is_some();
            }
            session.access_token = Some(AccessToken(access));
            session.to_stored()
        };
        if let Err(e) = self.store.save(&stored).await {
            warn!(error = %e, "could not persist refreshed token");
        }
        info!("access token refreshed");
        true
    }
}

fn ensure_accepted(resp: &HttpResponse) -> Result<(), AuthError> {
    if resp.is_success() {
        Ok(())
    } else {
        Err(AuthError::Rejected {
            status: resp.status,
            message: resp.text(),
        })
    }
}

fn into_result(resp: HttpResponse) -> Result<HttpResponse, RequestError> {
    if resp.is_success() {
        Ok(resp)
    } else if resp.is_unauthorized() {
        Err(RequestError::Unauthorized)
    } else {
        Err(RequestError::Server {
            status: resp.status,
            body: resp.text(),
        })
    }
}

#[async_trait::async_trait]
impl SessionService for SessionManager {
    async fn login(&self, credentials: Credentials) -> Result<Session, AuthError> {
        if credentials.username.trim().is_empty() || credentials.password.is_empty() {
            return Err(AuthError::MissingCredentials);
        }
        let endpoints = &self.inner.endpoints;
        let body = json!({
            "username": credentials.username,
            "password": credentials.password,
        });

        let resp = self
            .inner
            .transport
            .send(HttpRequest::new(&Endpoint::post(endpoints.session_login.as_str())).with_body(body.clone()))
            .await?;
        ensure_accepted(&resp)?;

        let resp = self
            .inner
            .transport
            .send(HttpRequest::new(&Endpoint::post(endpoints.token_issue.as_str())).with_body(body))
            .await?;
        ensure_accepted(&resp)?;
        let pair: TokenPairResponse = resp.json().map_err(|e| AuthError::Decode(e.to_string()))?;

        // The profile is fetched with the new token before anything is
        // committed, so a failure here leaves the previous session intact.
        let resp = self
            .inner
            .transport
            .send(
                HttpRequest::new(&Endpoint::get(endpoints.current_user.as_str()))
                    .with_bearer(Some(pair.access.as_str())),
            )
            .await?;
        ensure_accepted(&resp)?;
        let profile: UserProfile = resp.json().map_err(|e| AuthError::Decode(e.to_string()))?;

        let session = Session {
            access_token: Some(AccessToken(pair.access)),
            refresh_token: Some(RefreshToken(pair.refresh)),
            role: Some(profile.role),
        };
        {
            let _persist = self.inner.persist.lock().await;
            self.inner.store.save(&session.to_stored()).await?;
            *self.inner.lock_session() = session.clone();
        }

        info!(username = %credentials.username, role = ?profile.role, "logged in");
        Ok(session)
    }

    async fn authenticated_request(
        &self,
        endpoint: Endpoint,
        options: RequestOptions,
    ) -> Result<HttpResponse, RequestError> {
        let sent_with = self.access_token();
        let resp = self.dispatch(&endpoint, &options, sent_with.as_ref()).await?;
        if !resp.is_unauthorized() {
            return into_result(resp);
        }

        let current = self.access_token();
        let retry_with = if current.is_some() && current != sent_with {
            debug!(path = %endpoint.path, "token changed while request was in flight");
            current
        } else {
            let refresh = self.inner.lock_session().refresh_token.clone();
            if refresh.is_none() {
                return Err(RequestError::Unauthorized);
            }
            if !self.refresh().await {
                warn!(path = %endpoint.path, "session expired and could not be renewed");
                self.inner.clear_if_current(refresh.as_ref()).await;
                return Err(RequestError::Unauthorized);
            }
            self.access_token()
        };

        let resp = self.dispatch(&endpoint, &options, retry_with.as_ref()).await?;
        into_result(resp)
    }

    async fn refresh(&self) -> bool {
        let pending = {
            let mut slot = self.inner.lock_pending();
            match slot.as_ref() {
                Some(pending) => {
                    debug!("joining in-flight token refresh");
                    pending.clone()
                }
                None => {
                    let inner = self.inner.clone();
                    let fut = async move {
                        let refreshed = inner.run_refresh().await;
                        inner.lock_pending().take();
                        refreshed
                    }
                    .boxed()
                    .shared();
                    *slot = Some(fut.clone());
                    fut
                }
            }
        };
        pending.await
    }

    async fn logout(&self) {
        let transport = self.inner.transport.clone();
        let request = HttpRequest::new(&Endpoint::post(self.inner.endpoints.session_logout.as_str()));
        tokio::spawn(async move {
            match transport.send(request).await {
                Ok(resp) if resp.is_success() => debug!("server session closed"),
                Ok(resp) => debug!(status = resp.status, "server logout rejected"),
                Err(e) => debug!(error = %e, "server logout failed"),
            }
        });

        self.inner.clear().await;
        self.inner.navigator.redirect(RedirectTarget::Login);
        info!("logged out");
    }

    async fn load_current_user(&self) -> Result<Role, RequestError> {
        let endpoint = Endpoint::get(self.inner.endpoints.current_user.as_str());
        let resp = match self
            .authenticated_request(endpoint, RequestOptions::default())
            .await
        {
            Err(RequestError::Unauthorized) => {
                self.inner.clear().await;
                return Err(RequestError::Unauthorized);
            }
            other => other?,
        };
        let profile: UserProfile = resp.json().map_err(|_| RequestError::Server {
            status: resp.status,
            body: resp.text(),
        })?;

        let mut session = self.inner.lock_session();
        if session.is_authenticated() {
            session.role = Some(profile.role);
        }
        Ok(profile.role)
    }

    fn guard_access(&self, path: &str, requirement: Option<RoleRequirement>) -> GuardDecision {
        let session = self.inner.lock_session();
        guard_access(
            &self.inner.public_paths,
            path,
            session.is_authenticated(),
            session.role,
            requirement,
        )
    }

    fn enforce_guard(&self, path: &str, requirement: Option<RoleRequirement>) -> GuardDecision {
        let decision = self.guard_access(path, requirement);
        if let Some(target) = decision.redirect_target() {
            debug!(%path, ?target, "guard redirect");
            self.inner.navigator.redirect(target);
        }
        decision
    }

    fn snapshot(&self) -> Session {
        self.inner.lock_session().clone()
    }

    fn is_authenticated(&self) -> bool {
        self.inner.lock_session().is_authenticated()
    }

    fn role(&self) -> Option<Role> {
        self.inner.lock_session().role
    }

    fn has_refresh_token(&self) -> bool {
        self.inner.lock_session().refresh_token.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra_fake::*;
    use crate::infra_store::MemoryTokenStore;
    use futures_util::future::join_all;

    const STATS: &str = "/api/stats/";
    const REFRESH: &str = "/api/token/refresh/";

    struct Fixture {
        manager: SessionManager,
        fake: Arc<FakeTransport>,
        store: Arc<MemoryTokenStore>,
        navigator: Arc<RecordingNavigator>,
    }

    fn fixture_with(store: MemoryTokenStore) -> Fixture {
        let fake = Arc::new(FakeTransport::new());
        let store = Arc::new(store);
        let navigator = Arc::new(RecordingNavigator::new());
        let manager = SessionManager::new(
            fake.clone(),
            store.clone(),
            navigator.clone(),
            AuthEndpoints::default(),
            PublicPaths::default(),
        );
        Fixture {
            manager,
            fake,
            store,
            navigator,
        }
    }

    async fn logged_in(access: &str, refresh: Option<&str>) -> Fixture {
        let stored = StoredTokens {
            access_token: Some(access.to_string()),
            refresh_token: refresh.map(str::to_string),
        };
        let f = fixture_with(MemoryTokenStore::with_tokens(stored));
        let manager = SessionManager::restore(
            f.fake.clone(),
            f.store.clone(),
            f.navigator.clone(),
            AuthEndpoints::default(),
            PublicPaths::default(),
        )
        .await
        .unwrap();
        Fixture { manager, ..f }
    }

    fn accept_only(fake: &FakeTransport, method: Method, path: &str, token: &'static str) {
        fake.on(method, path, move |req| {
            if req.bearer.as_deref() == Some(token) {
                Ok(HttpResponse::new(200, r#"{"ok":true}"#))
            } else {
                Ok(HttpResponse::new(401, r#"{"detail":"expired"}"#))
            }
        });
    }

    fn script_login(fake: &FakeTransport, role: &str) {
        fake.respond(Method::Post, "/auth/login/", 200, json!({"status": "ok"}));
        fake.respond(
            Method::Post,
            "/api/token/",
            200,
            json!({"access": "T1", "refresh": "R1"}),
        );
        fake.respond(
            Method::Get,
            "/api/users/me/",
            200,
            json!({"id": 7, "username": "amy", "role": role}),
        );
    }

    #[tokio::test]
    async fn login_populates_memory_and_storage() {
        let f = fixture_with(MemoryTokenStore::new());
        script_login(&f.fake, "storekeeper");

        let session = f.manager.login(Credentials::new("amy", "pw")).await.unwrap();

        assert_eq!(session.access_token, Some(AccessToken("T1".into())));
        assert_eq!(session.refresh_token, Some(RefreshToken("R1".into())));
        assert_eq!(session.role, Some(Role::Storekeeper));
        assert_eq!(f.manager.snapshot(), session);
        assert_eq!(f.store.current(), session.to_stored());

        let profile_call = f
            .fake
            .requests()
            .into_iter()
            .find(|r| r.path == "/api/users/me/")
            .unwrap();
        assert_eq!(profile_call.bearer.as_deref(), Some("T1"));
    }

    #[tokio::test]
    async fn failed_login_leaves_session_unchanged() {
        let f = logged_in("OLD", Some("ROLD")).await;
        let before = f.manager.snapshot();
        f.fake.respond(Method::Post, "/auth/login/", 200, json!({"status": "ok"}));
        f.fake.on(Method::Post, "/api/token/", |_| {
            Ok(HttpResponse::new(401, "No active account found"))
        });

        let err = f
            .manager
            .login(Credentials::new("amy", "wrong"))
            .await
            .unwrap_err();

        match err {
            AuthError::Rejected { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "No active account found");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(f.manager.snapshot(), before);
        assert_eq!(f.store.current(), before.to_stored());
    }

    #[tokio::test]
    async fn failed_profile_lookup_does_not_commit_tokens() {
        let f = fixture_with(MemoryTokenStore::new());
        script_login(&f.fake, "admin");
        f.fake.on(Method::Get, "/api/users/me/", |_| Ok(HttpResponse::new(500, "down")));

        assert!(f.manager.login(Credentials::new("amy", "pw")).await.is_err());
        assert_eq!(f.manager.snapshot(), Session::default());
        assert!(f.store.current().is_empty());
    }

    #[tokio::test]
    async fn blank_credentials_never_reach_the_server() {
        let f = fixture_with(MemoryTokenStore::new());
        let err = f.manager.login(Credentials::new(" ", "pw")).await.unwrap_err();
        assert!(matches!(err, AuthError::MissingCredentials));
        assert!(f.fake.requests().is_empty());
    }

    #[tokio::test]
    async fn restore_after_login_yields_same_tokens() {
        let f = fixture_with(MemoryTokenStore::new());
        script_login(&f.fake, "admin");
        let session = f.manager.login(Credentials::new("amy", "pw")).await.unwrap();

        let restored = SessionManager::restore(
            f.fake.clone(),
            f.store.clone(),
            f.navigator.clone(),
            AuthEndpoints::default(),
            PublicPaths::default(),
        )
        .await
        .unwrap();

        let snapshot = restored.snapshot();
        assert_eq!(snapshot.access_token, session.access_token);
        assert_eq!(snapshot.refresh_token, session.refresh_token);
        assert_eq!(snapshot.role, None);
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_and_request_retried_once() {
        let f = logged_in("T1", Some("R1")).await;
        accept_only(&f.fake, Method::Get, STATS, "T2");
        f.fake.respond(Method::Post, REFRESH, 200, json!({"access": "T2"}));

        let resp = f
            .manager
            .authenticated_request(Endpoint::get(STATS), RequestOptions::default())
            .await
            .unwrap();

        assert_eq!(resp.status, 200);
        let calls: Vec<_> = f
            .fake
            .requests()
            .into_iter()
            .filter(|r| r.path == STATS)
            .collect();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].bearer.as_deref(), Some("T1"));
        assert_eq!(calls[1].bearer.as_deref(), Some("T2"));

        let refresh_call = f
            .fake
            .requests()
            .into_iter()
            .find(|r| r.path == REFRESH)
            .unwrap();
        assert_eq!(refresh_call.body, Some(json!({"refresh": "R1"})));
        assert_eq!(f.store.current().access_token.as_deref(), Some("T2"));
        assert_eq!(f.store.current().refresh_token.as_deref(), Some("R1"));
    }

    #[tokio::test]
    async fn missing_refresh_token_returns_unauthorized_immediately() {
        let f = logged_in("T1", None).await;
        accept_only(&f.fake, Method::Get, STATS, "never");

        let err = f
            .manager
            .authenticated_request(Endpoint::get(STATS), RequestOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), RequestErrorKind::Unauthorized);
        assert_eq!(f.fake.count(Method::Post, REFRESH), 0);
        assert_eq!(f.fake.count(Method::Get, STATS), 1);
    }

    #[tokio::test]
    async fn second_401_is_not_retried_again() {
        let f = logged_in("T1", Some("R1")).await;
        accept_only(&f.fake, Method::Get, STATS, "never");
        f.fake.respond(Method::Post, REFRESH, 200, json!({"access": "T2"}));

        let err = f
            .manager
            .authenticated_request(Endpoint::get(STATS), RequestOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), RequestErrorKind::Unauthorized);
        assert_eq!(f.fake.count(Method::Get, STATS), 2);
        assert_eq!(f.fake.count(Method::Post, REFRESH), 1);
        assert!(f.manager.snapshot().is_authenticated());
    }

    #[tokio::test]
    async fn failed_refresh_surfaces_unauthorized_and_clears_session() {
        let f = logged_in("T1", Some("R1")).await;
        accept_only(&f.fake, Method::Get, STATS, "T2");
        f.fake.respond(Method::Post, REFRESH, 401, json!({"detail": "Token is invalid"}));

        let err = f
            .manager
            .authenticated_request(Endpoint::get(STATS), RequestOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), RequestErrorKind::Unauthorized);
        assert_eq!(f.fake.count(Method::Get, STATS), 1);
        assert_eq!(f.manager.snapshot(), Session::default());
        assert!(f.store.current().is_empty());
    }

    #[tokio::test]
    async fn concurrent_401s_share_one_successful_refresh() {
        const N: usize = 5;
        let f = logged_in("T1", Some("R1")).await;
        accept_only(&f.fake, Method::Get, STATS, "T2");
        f.fake.respond(Method::Post, REFRESH, 200, json!({"access": "T2"}));
        let gate = f.fake.gate(Method::Post, REFRESH);

        let requests = join_all((0..N).map(|_| {
            f.manager
                .authenticated_request(Endpoint::get(STATS), RequestOptions::default())
        }));
        let release = async {
            while f.fake.count(Method::Get, STATS) < N || f.fake.count(Method::Post, REFRESH) < 1 {
                tokio::task::yield_now().await;
            }
            gate.add_permits(1);
        };
        let (results, ()) = tokio::join!(requests, release);

        assert!(results.iter().all(|r| matches!(r, Ok(resp) if resp.status == 200)));
        assert_eq!(f.fake.count(Method::Post, REFRESH), 1);
        assert_eq!(f.fake.count(Method::Get, STATS), 2 * N);
    }

    #[tokio::test]
    async fn concurrent_401s_all_fail_when_shared_refresh_fails() {
        const N: usize = 4;
        let f = logged_in("T1", Some("R1")).await;
        accept_only(&f.fake, Method::Get, STATS, "T2");
        f.fake.respond(Method::Post, REFRESH, 401, json!({"detail": "expired"}));
        let gate = f.fake.gate(Method::Post, REFRESH);

        let requests = join_all((0..N).map(|_| {
            f.manager
                .authenticated_request(Endpoint::get(STATS), RequestOptions::default())
        }));
        let release = async {
            while f.fake.count(Method::Get, STATS) < N || f.fake.count(Method::Post, REFRESH) < 1 {
                tokio::task::yield_now().await;
            }
            gate.add_permits(1);
        };
        let (results, ()) = tokio::join!(requests, release);

        assert!(results.iter().all(|r| matches!(r, Err(RequestError::Unauthorized))));
        assert_eq!(f.fake.count(Method::Post, REFRESH), 1);
        assert_eq!(f.fake.count(Method::Get, STATS), N);
    }

    #[tokio::test]
    async fn refresh_called_twice_in_same_tick_issues_one_call() {
        let f = logged_in("T1", Some("R1")).await;
        f.fake.respond(Method::Post, REFRESH, 200, json!({"access": "T2"}));
        let gate = f.fake.gate(Method::Post, REFRESH);

        let release = async {
            while f.fake.count(Method::Post, REFRESH) < 1 {
                tokio::task::yield_now().await;
            }
            gate.add_permits(1);
        };
        let (a, b, ()) = tokio::join!(f.manager.refresh(), f.manager.refresh(), release);

        assert!(a && b);
        assert_eq!(f.fake.count(Method::Post, REFRESH), 1);

        // The slot is emptied once the shared refresh settles.
        gate.add_permits(1);
        assert!(f.manager.refresh().await);
        assert_eq!(f.fake.count(Method::Post, REFRESH), 2);
    }

    /// Memory store whose writes take several scheduler turns, like a file.
    struct SlowStore(MemoryTokenStore);

    #[async_trait::async_trait]
    impl TokenStore for SlowStore {
        async fn load(&self) -> Result<StoredTokens, StoreError> {
            self.0.load().await
        }

        async fn save(&self, tokens: &StoredTokens) -> Result<(), StoreError> {
            for _ in 0..5 {
                tokio::task::yield_now().await;
            }
            self.0.save(tokens).await
        }

        async fn clear(&self) -> Result<(), StoreError> {
            tokio::task::yield_now().await;
            self.0.clear().await
        }
    }

    #[tokio::test]
    async fn logout_while_refresh_is_persisting_leaves_storage_empty() {
        let fake = Arc::new(FakeTransport::new());
        fake.respond(Method::Post, REFRESH, 200, json!({"access": "T2"}));
        let store = Arc::new(SlowStore(MemoryTokenStore::with_tokens(StoredTokens {
            access_token: Some("T1".into()),
            refresh_token: Some("R1".into()),
        })));
        let manager = SessionManager::restore(
            fake.clone(),
            store.clone(),
            Arc::new(RecordingNavigator::new()),
            AuthEndpoints::default(),
            PublicPaths::default(),
        )
        .await
        .unwrap();

        let (_, ()) = tokio::join!(manager.refresh(), async {
            tokio::task::yield_now().await;
            manager.logout().await;
        });

        assert_eq!(manager.snapshot(), Session::default());
        assert!(store.0.current().is_empty());
        let restarted = SessionManager::restore(
            fake,
            store.clone(),
            Arc::new(RecordingNavigator::new()),
            AuthEndpoints::default(),
            PublicPaths::default(),
        )
        .await
        .unwrap();
        assert!(!restarted.is_authenticated());
    }

    #[tokio::test]
    async fn refresh_finishing_after_logout_reports_failure() {
        let f = logged_in("T1", Some("R1")).await;
        f.fake.respond(Method::Post, REFRESH, 200, json!({"access": "T2"}));
        let gate = f.fake.gate(Method::Post, REFRESH);

        let (refreshed, ()) = tokio::join!(f.manager.refresh(), async {
            tokio::task::yield_now().await;
            f.manager.logout().await;
            gate.add_permits(1);
        });

        assert!(!refreshed);
        assert_eq!(f.manager.snapshot(), Session::default());
        assert!(f.store.current().is_empty());
    }

    #[tokio::test]
    async fn refresh_finishing_after_login_keeps_new_pair_in_storage() {
        let f = logged_in("A0", Some("R0")).await;
        f.fake.respond(Method::Post, REFRESH, 200, json!({"access": "A1"}));
        let gate = f.fake.gate(Method::Post, REFRESH);
        script_login(&f.fake, "admin");

        let (refreshed, login) = tokio::join!(f.manager.refresh(), async {
            tokio::task::yield_now().await;
            let r = f.manager.login(Credentials::new("amy", "pw")).await;
            gate.add_permits(1);
            r
        });

        assert!(login.is_ok());
        assert!(refreshed);
        let stored = f.store.current();
        assert_eq!(stored.access_token.as_deref(), Some("T1"));
        assert_eq!(stored.refresh_token.as_deref(), Some("R1"));
        assert_eq!(f.manager.snapshot().access_token, Some(AccessToken("T1".into())));
    }

    #[tokio::test]
    async fn failed_refresh_keeps_existing_tokens() {
        let f = logged_in("T1", Some("R1")).await;
        f.fake.respond(Method::Post, REFRESH, 500, json!({"detail": "oops"}));

        assert!(!f.manager.refresh().await);
        let session = f.manager.snapshot();
        assert_eq!(session.access_token, Some(AccessToken("T1".into())));
        assert_eq!(session.refresh_token, Some(RefreshToken("R1".into())));
    }

    #[tokio::test]
    async fn refresh_without_refresh_token_makes_no_call() {
        let f = logged_in("T1", None).await;
        assert!(!f.manager.refresh().await);
        assert!(f.fake.requests().is_empty());
    }

    #[tokio::test]
    async fn request_in_flight_during_refresh_retries_without_new_refresh() {
        let f = logged_in("T1", Some("R1")).await;
        accept_only(&f.fake, Method::Get, STATS, "T2");
        f.fake.respond(Method::Post, REFRESH, 200, json!({"access": "T2"}));
        let gate = f.fake.gate(Method::Get, STATS);

        let request = f
            .manager
            .authenticated_request(Endpoint::get(STATS), RequestOptions::default());
        let renew = async {
            while f.fake.count(Method::Get, STATS) < 1 {
                tokio::task::yield_now().await;
            }
            assert!(f.manager.refresh().await);
            gate.add_permits(2);
        };
        let (result, ()) = tokio::join!(request, renew);

        assert_eq!(result.unwrap().status, 200);
        assert_eq!(f.fake.count(Method::Post, REFRESH), 1);
        assert_eq!(f.fake.count(Method::Get, STATS), 2);
    }

    #[tokio::test]
    async fn transport_failure_is_a_network_error() {
        let f = logged_in("T1", Some("R1")).await;
        f.fake.on(Method::Get, STATS, |_| {
            Err(TransportError::Connect("connection refused".into()))
        });

        let err = f
            .manager
            .authenticated_request(Endpoint::get(STATS), RequestOptions::default())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), RequestErrorKind::NetworkError);
        assert_eq!(f.fake.count(Method::Get, STATS), 1);
    }

    #[tokio::test]
    async fn server_error_carries_body() {
        let f = logged_in("T1", Some("R1")).await;
        f.fake.on(Method::Get, STATS, |_| Ok(HttpResponse::new(503, "maintenance")));

        let err = f
            .manager
            .authenticated_request(Endpoint::get(STATS), RequestOptions::default())
            .await
            .unwrap_err();

        match err {
            RequestError::Server { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "maintenance");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn logout_clears_even_when_server_call_fails() {
        let f = logged_in("T1", Some("R1")).await;
        f.fake.on(Method::Post, "/auth/logout/", |_| Err(TransportError::Timeout));

        f.manager.logout().await;

        assert_eq!(f.manager.snapshot(), Session::default());
        assert!(f.store.current().is_empty());
        assert_eq!(f.navigator.redirects(), vec![RedirectTarget::Login]);
    }

    #[tokio::test]
    async fn unauthorized_profile_lookup_clears_session() {
        let f = logged_in("T1", None).await;
        accept_only(&f.fake, Method::Get, "/api/users/me/", "never");

        let err = f.manager.load_current_user().await.unwrap_err();

        assert_eq!(err.kind(), RequestErrorKind::Unauthorized);
        assert_eq!(f.manager.snapshot(), Session::default());
        assert!(!f.manager.is_authenticated());
    }

    #[tokio::test]
    async fn profile_lookup_caches_role() {
        let f = logged_in("T1", Some("R1")).await;
        f.fake.respond(Method::Get, "/api/users/me/", 200, json!({"role": "admin"}));

        assert_eq!(f.manager.load_current_user().await.unwrap(), Role::Admin);
        assert_eq!(f.manager.role(), Some(Role::Admin));
        assert!(f.manager.is_authenticated());
    }

    #[tokio::test]
    async fn guard_uses_session_state_and_redirects() {
        let f = fixture_with(MemoryTokenStore::new());
        assert_eq!(f.manager.guard_access("/login/", None), GuardDecision::Allow);
        assert_eq!(
            f.manager.enforce_guard("/inventory/", Some(RoleRequirement::Manager)),
            GuardDecision::RedirectToLogin
        );

        script_login(&f.fake, "worker");
        f.manager.login(Credentials::new("amy", "pw")).await.unwrap();
        assert_eq!(
            f.manager.enforce_guard("/inventory/", Some(RoleRequirement::Manager)),
            GuardDecision::RedirectHome
        );
        assert_eq!(f.manager.enforce_guard("/equipment/", None), GuardDecision::Allow);
        assert_eq!(
            f.navigator.redirects(),
            vec![RedirectTarget::Login, RedirectTarget::Home]
        );
    }
}
