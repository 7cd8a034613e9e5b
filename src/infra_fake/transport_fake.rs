use crate::domain_model::{HttpRequest, HttpResponse, Method};
use crate::domain_port::{HttpTransport, TransportError};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Semaphore;

type Responder = Arc<dyn Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync>;

struct Route {
    responder: Responder,
    gate: Option<Arc<Semaphore>>,
}

/// Scriptable in-process API. Routes are keyed by method and exact path;
/// unknown routes answer 404. Every request is recorded before it is answered.
#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<HashMap<(Method, String), Route>>,
    log: Mutex<Vec<HttpRequest>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&self, method: Method, path: &str, responder: F) -> &Self
    where
        F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync + 'static,
    {
        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        let gate = routes
            .remove(&(method, path.to_string()))
            .and_then(|r| r.gate);
        routes.insert(
            (method, path.to_string()),
            Route {
                responder: Arc::new(responder),
                gate,
            },
        );
        self
    }

    pub fn respond(&self, method: Method, path: &str, status: u16, body: serde_json::Value) -> &Self {
        let body = body.to_string();
        self.on(method, path, move |_| Ok(HttpResponse::new(status, body.clone())))
    }

    /// Holds replies on a route until permits are added to the returned
    /// semaphore, one permit per reply.
    pub fn gate(&self, method: Method, path: &str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(route) = routes.get_mut(&(method, path.to_string())) {
            route.gate = Some(gate.clone());
        }
        gate
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    /// A self-contained API backing the `fake` backend: any non-empty
    /// password logs in, the username picks the role, and protected routes
    /// require a `fake-access-token:` bearer.
    pub fn with_demo_routes() -> Self {
        let fake = Self::new();
        fake.respond(Method::Post, "/auth/login/", 200, json!({"status": "ok"}));
        fake.respond(Method::Post, "/auth/logout/", 200, json!({"status": "ok"}));
        fake.on(Method::Post, "/api/token/", |req| {
            let username = body_str(req, "username");
            let password = body_str(req, "password");
            if username.is_empty() || password.is_empty() {
                return Ok(HttpResponse::new(401, r#"{"detail":"Invalid credentials"}"#));
            }
            Ok(json_response(
                200,
                json!({
                    "access": format!("fake-access-token:{}", username),
                    "refresh": format!("fake-refresh-token:{}", username),
                }),
            ))
        });
        fake.on(Method::Post, "/api/token/refresh/", |req| {
            match body_str(req, "refresh").strip_prefix("fake-refresh-token:") {
                Some(username) => Ok(json_response(
                    200,
                    json!({"access": format!("fake-access-token:{}", username)}),
                )),
                None => Ok(HttpResponse::new(401, r#"{"detail":"Token is invalid"}"#)),
            }
        });
        protected(&fake, Method::Get, "/api/users/me/", |username| {
            let role = match username {
                "admin" | "storekeeper" | "observer" => username,
                _ => "worker",
            };
            json!({"id": 1, "username": username, "role": role})
        });
        protected(&fake, Method::Get, "/api/equipment/", |_| {
            json!([
                {
                    "id": "6f1c7a1e-8d1b-4d0e-9a55-0f4b1f4b8e01",
                    "name": "Drill",
                    "status": "in_stock",
                    "location_detail": {"id": 1, "name": "Main hall"}
                },
                {
                    "id": "0b7e5e0e-3f43-4d36-a7c6-2a1a7e5c9d02",
                    "name": "Ladder",
                    "status": "issued",
                    "location_detail": null
                }
            ])
        });
        protected(&fake, Method::Get, "/api/notifications/", |_| {
            json!([{"id": 1, "kind": "info", "title": "Welcome", "message": "", "is_read": false}])
        });
        protected(&fake, Method::Post, "/api/notifications/mark_all_read/", |_| {
            json!({"updated": 1})
        });
        protected(&fake, Method::Get, "/api/notifications/overdue/", |_| {
            json!({"overdue": []})
        });
        protected(&fake, Method::Get, "/api/stats/", |_| {
            json!({"total_operations": 0, "by_action": []})
        });
        fake
    }
}

fn protected<F>(fake: &FakeTransport, method: Method, path: &str, body: F)
where
    F: Fn(&str) -> serde_json::Value + Send + Sync + 'static,
{
    fake.on(method, path, move |req| {
        match req
            .bearer
            .as_deref()
            .and_then(|t| t.strip_prefix("fake-access-token:"))
        {
            Some(username) => Ok(json_response(200, body(username))),
            None => Ok(HttpResponse::new(
                401,
                r#"{"detail":"Authentication credentials were not provided."}"#,
            )),
        }
    });
}

fn body_str(req: &HttpRequest, key: &str) -> String {
    req.body
        .as_ref()
        .and_then(|b| b.get(key))
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

fn json_response(status: u16, body: serde_json::Value) -> HttpResponse {
    HttpResponse::new(status, body.to_string())
}

#[async_trait::async_trait]
impl HttpTransport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let route = {
            let routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
            routes
                .get(&(request.method, request.path.clone()))
                .map(|r| (r.responder.clone(), r.gate.clone()))
        };
        let Some((responder, gate)) = route else {
            return Ok(HttpResponse::new(404, r#"{"detail":"Not found."}"#));
        };
        if let Some(gate) = gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| TransportError::Other(e.to_string()))?;
            permit.forget();
        }
        responder(&request)
    }
}
