//! Wire types returned by the imaging backend.
//!
//! Field names follow the backend's JSON verbatim, so these structs need no
//! renaming attributes. The backend is read-only from the dashboard's point
//! of view; the only locally written field is `segmentation_loaded_at`,
//! stamped on each study when an authenticated listing is fetched.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A medical check grouping one or more imaging studies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicalCheck {
    pub id: i64,
    pub code: String,
    pub orthanc_uuid: String,
    /// Processing status; `null` while the check has not been triaged.
    pub status: Option<i64>,
    pub studies: Vec<Study>,
}

/// An imaging study within a check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Study {
    pub id: i64,
    pub name: String,
    pub uuid: String,
    pub status: i64,
    pub orthanc_uuid: String,
    /// When the study arrived at the imaging backend.
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub arrived_at: Option<OffsetDateTime>,
    /// When the dashboard last loaded this study's segmentation. Stamped
    /// locally on authenticated listings.
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub segmentation_loaded_at: Option<OffsetDateTime>,
    pub series: Vec<Series>,
}

/// A DICOM series within a study.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub id: i64,
    pub name: String,
    pub uuid: String,
    pub status: i64,
    pub orthanc_uuid: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_check_json() -> serde_json::Value {
        json!({
            "id": 42,
            "code": "CHK-0042",
            "orthanc_uuid": "f3a1c2d4",
            "status": null,
            "studies": [{
                "id": 7,
                "name": "Thorax CT",
                "uuid": "1.2.840.10008.1.7",
                "status": 2,
                "orthanc_uuid": "a1b2c3",
                "arrived_at": "2025-06-02T10:15:00Z",
                "series": [{
                    "id": 70,
                    "name": "Axial",
                    "uuid": "1.2.840.10008.1.70",
                    "status": 1,
                    "orthanc_uuid": "d4e5f6",
                }],
            }],
        })
    }

    #[test]
    fn test_deserialize_backend_payload() {
        let check: MedicalCheck = serde_json::from_value(sample_check_json()).unwrap();

        assert_eq!(check.id, 42);
        assert_eq!(check.code, "CHK-0042");
        assert_eq!(check.status, None);
        assert_eq!(check.studies.len(), 1);

        let study = &check.studies[0];
        assert_eq!(study.name, "Thorax CT");
        assert!(study.arrived_at.is_some());
        assert!(study.segmentation_loaded_at.is_none());
        assert_eq!(study.series[0].orthanc_uuid, "d4e5f6");
    }

    #[test]
    fn test_serialized_field_names_match_the_wire() {
        let check: MedicalCheck = serde_json::from_value(sample_check_json()).unwrap();
        let serialized = serde_json::to_string(&check).unwrap();

        assert!(serialized.contains("\"orthanc_uuid\""));
        assert!(serialized.contains("\"arrived_at\""));
        // Absent timestamps stay absent rather than becoming null.
        assert!(!serialized.contains("segmentation_loaded_at"));
    }

    #[test]
    fn test_status_may_be_a_number() {
        let mut value = sample_check_json();
        value["status"] = json!(3);

        let check: MedicalCheck = serde_json::from_value(value).unwrap();
        assert_eq!(check.status, Some(3));
    }
}
