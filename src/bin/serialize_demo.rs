use warehouse_client::domain_model::*;

fn main() {
    let equipment_id: EquipmentId = "6f1c7a1e-8d1b-4d0e-9a55-0f4b1f4b8e01".parse().unwrap();

    let issue = IssueRequest {
        equipment_id,
        target_user_id: 7,
        notes: "night shift".to_string(),
        due_at: None,
    };
    println!("{}", serde_json::to_string(&issue).unwrap());

    let ret = ReturnRequest {
        equipment_id,
        condition: ReturnCondition::NeedRepair,
        notes: String::new(),
    };
    println!("{}", serde_json::to_string(&ret).unwrap());

    let stored = StoredTokens {
        access_token: Some("a".to_string()),
        refresh_token: None,
    };
    println!("{}", serde_json::to_string(&stored).unwrap());
}
