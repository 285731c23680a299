//! Test fixtures

use stockpile_core::{AssetId, CandidateRecord};

/// Candidate with a URL derived from its id
pub fn candidate(id: &str) -> CandidateRecord {
    CandidateRecord::new(id, url_for(id)).expect("valid fixture")
}

/// Candidates for a list of ids
pub fn candidates(ids: &[&str]) -> Vec<CandidateRecord> {
    ids.iter().map(|id| candidate(id)).collect()
}

/// Source URL used by fixtures
pub fn url_for(id: &str) -> String {
    format!("https://media.example/{}/giphy.gif", id)
}

pub fn asset_id(id: &str) -> AssetId {
    AssetId::new(id).expect("valid fixture")
}

/// Giphy search payload for a list of ids
pub fn giphy_payload(ids: &[&str]) -> serde_json::Value {
    let data: Vec<_> = ids
        .iter()
        .map(|id| {
            serde_json::json!({
                "id": id,
                "images": {
                    "original": { "url": url_for(id), "width": "480", "height": "270" },
                    "preview_gif": { "url": format!("https://media.example/{}/preview.gif", id), "width": "120", "height": "68" }
                }
            })
        })
        .collect();

    serde_json::json!({ "data": data, "meta": { "status": 200, "msg": "OK" } })
}
