//! JSON wire types for the REST surface.
//!
//! Field names are camelCase on the wire to match the FHIR-facing clients.

use cohort_uuid::ResultId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Facts of a query's first page, used to register a result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateResultReq {
    pub total: u64,
    #[serde(default)]
    pub self_address: Option<String>,
    #[serde(default)]
    pub next_address: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CreateResultRes {
    #[schema(value_type = String, example = "0f8c2d7e4b1a4c9e8d3f6a5b2c1e0d9f")]
    pub id: ResultId,
}

/// A search to run against the source, absolute or relative to its base URL.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OpenQueryReq {
    pub query: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResultStatsRes {
    pub total_size: u64,
    pub number_of_pages: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ConditionSummary {
    /// `Condition/<id>`
    pub condition: String,
    /// `ClinicalImpression/<id>` keys, in first-seen order.
    pub impressions: Vec<String>,
}

/// One subject of a page, expressed as reference keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubjectSummary {
    pub patient: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vital_status: Option<String>,
    pub conditions: Vec<ConditionSummary>,
    pub specimens: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubjectTreeRes {
    #[schema(value_type = String)]
    pub result_id: ResultId,
    pub page: usize,
    pub records: usize,
    pub subjects: Vec<SubjectSummary>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_uses_camel_case_and_optional_links() {
        let req: CreateResultReq =
            serde_json::from_str(r#"{ "total": 10, "selfAddress": "A" }"#).expect("parse");
        assert_eq!(req.total, 10);
        assert_eq!(req.self_address.as_deref(), Some("A"));
        assert!(req.next_address.is_none());
    }

    #[test]
    fn result_id_travels_as_a_bare_hex_string() {
        let id = ResultId::new();
        let json = serde_json::to_value(CreateResultRes { id }).expect("serialise");
        assert_eq!(json["id"], id.to_string());

        let back: CreateResultRes = serde_json::from_value(json).expect("parse");
        assert_eq!(back.id, id);
        assert!(serde_json::from_str::<CreateResultRes>(r#"{ "id": "nope" }"#).is_err());
    }

    #[test]
    fn stats_serialise_in_camel_case() {
        let json = serde_json::to_value(ResultStatsRes {
            total_size: 143_513,
            number_of_pages: 2871,
        })
        .expect("serialise");
        assert_eq!(json["totalSize"], 143_513);
        assert_eq!(json["numberOfPages"], 2871);
    }

    #[test]
    fn absent_vital_status_is_omitted() {
        let json = serde_json::to_value(SubjectSummary {
            patient: "Patient/p1".into(),
            vital_status: None,
            conditions: vec![],
            specimens: vec![],
        })
        .expect("serialise");
        assert!(json.get("vitalStatus").is_none());
        assert_eq!(json["patient"], "Patient/p1");
    }
}
