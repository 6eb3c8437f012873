//! Attendance domain models.
//!
//! Field names follow the backend's JSON (`familyname`, `person_id`). The
//! backend is loosely typed, so ids may arrive as numbers and the
//! attendance flag as `0`/`1`; both are normalized on the way in.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// A person in the attendance directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Opaque backend-assigned identifier.
    #[serde(deserialize_with = "de::string_or_number")]
    pub id: String,
    #[serde(deserialize_with = "de::text_or_null")]
    pub surname: String,
    #[serde(rename = "familyname", default, deserialize_with = "de::text_or_null")]
    pub family_name: String,
    /// Given name.
    #[serde(deserialize_with = "de::text_or_null")]
    pub name: String,
    #[serde(default, deserialize_with = "de::text_or_null")]
    pub cellphone: String,
    #[serde(default, deserialize_with = "de::text_or_null")]
    pub address: String,
}

impl Person {
    /// Build a person from a creation payload and the id the backend chose.
    pub fn from_new(id: impl Into<String>, new: &NewPerson) -> Self {
        Self {
            id: id.into(),
            surname: new.surname.clone(),
            family_name: new.family_name.clone(),
            name: new.name.clone(),
            cellphone: new.cellphone.clone(),
            address: new.address.clone(),
        }
    }

    /// Whether any searchable field contains `term`.
    ///
    /// `term` must already be lowercased and trimmed.
    #[must_use]
    pub fn matches(&self, term: &str) -> bool {
        [
            &self.name,
            &self.surname,
            &self.family_name,
            &self.cellphone,
            &self.address,
        ]
        .into_iter()
        .any(|field| field.to_lowercase().contains(term))
    }
}

/// Payload for creating a person. The backend assigns the id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPerson {
    pub surname: String,
    #[serde(rename = "familyname")]
    pub family_name: String,
    pub name: String,
    pub cellphone: String,
    pub address: String,
}

/// One person's attendance entry for a date.
///
/// `attendance == None` means no entry exists for this person on this date,
/// which is distinct from `Some(false)` (explicitly marked absent).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    #[serde(deserialize_with = "de::string_or_number")]
    pub person_id: String,
    #[serde(default, deserialize_with = "de::text_or_null")]
    pub name: String,
    #[serde(default, deserialize_with = "de::text_or_null")]
    pub surname: String,
    #[serde(rename = "familyname", default, deserialize_with = "de::text_or_null")]
    pub family_name: String,
    /// Record identifier; `None` until the entry has been recorded.
    #[serde(default, deserialize_with = "de::opt_string_or_number")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_flag")]
    pub attendance: Option<bool>,
    /// `None` when the backend sends no usable date (null, empty or a
    /// placeholder such as `0000-00-00`).
    #[serde(default, deserialize_with = "de::lenient_date")]
    pub date: Option<NaiveDate>,
}

impl AttendanceRecord {
    /// A not-yet-recorded entry for `person` on `date`.
    #[must_use]
    pub fn for_person(person: &Person, date: NaiveDate, attendance: bool) -> Self {
        Self {
            person_id: person.id.clone(),
            name: person.name.clone(),
            surname: person.surname.clone(),
            family_name: person.family_name.clone(),
            id: None,
            attendance: Some(attendance),
            date: Some(date),
        }
    }

    #[must_use]
    pub fn is_recorded(&self) -> bool {
        self.id.is_some()
    }
}

/// Present/absent counts for a date.
///
/// Records whose attendance is unknown are counted as absent, so
/// `attended + absent` always equals the number of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceStats {
    pub attended: usize,
    pub absent: usize,
}

impl AttendanceStats {
    #[must_use]
    pub fn from_records(records: &[AttendanceRecord]) -> Self {
        let attended = records
            .iter()
            .filter(|r| r.attendance == Some(true))
            .count();
        Self {
            attended,
            absent: records.len() - attended,
        }
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.attended + self.absent
    }
}

mod de {
    use super::{Deserialize, Deserializer, NaiveDate};
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Int(i64),
        UInt(u64),
        Bool(bool),
    }

    impl Scalar {
        fn into_text<E: Error>(self) -> Result<String, E> {
            match self {
                Self::Text(s) => Ok(s),
                Self::Int(n) => Ok(n.to_string()),
                Self::UInt(n) => Ok(n.to_string()),
                Self::Bool(_) => Err(E::custom("expected a string or number")),
            }
        }
    }

    pub(super) fn string_or_number<'de, D>(d: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Scalar::deserialize(d)?.into_text()
    }

    pub(super) fn opt_string_or_number<'de, D>(d: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<Scalar>::deserialize(d)?
            .map(Scalar::into_text)
            .transpose()
    }

    pub(super) fn text_or_null<'de, D>(d: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(opt_string_or_number(d)?.unwrap_or_default())
    }

    /// `YYYY-MM-DD`, optionally followed by a time part. Anything else is
    /// dropped with a warning rather than failing the whole record.
    pub(super) fn lenient_date<'de, D>(d: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(value) = Option::<Scalar>::deserialize(d)? else {
            return Ok(None);
        };
        let Scalar::Text(text) = value else {
            tracing::warn!("ignoring non-text attendance date");
            return Ok(None);
        };
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }
        let day = text.split([' ', 'T']).next().unwrap_or(text);
        match day.parse::<NaiveDate>() {
            Ok(date) => Ok(Some(date)),
            Err(e) => {
                tracing::warn!(date = %text, error = %e, "ignoring unparseable attendance date");
                Ok(None)
            }
        }
    }

    pub(super) fn opt_flag<'de, D>(d: D) -> Result<Option<bool>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(value) = Option::<Scalar>::deserialize(d)? else {
            return Ok(None);
        };
        match value {
            Scalar::Bool(b) => Ok(Some(b)),
            Scalar::Int(n) => Ok(Some(n != 0)),
            Scalar::UInt(n) => Ok(Some(n != 0)),
            Scalar::Text(s) => match s.trim() {
                "1" | "true" => Ok(Some(true)),
                "0" | "false" => Ok(Some(false)),
                "" => Ok(None),
                other => Err(D::Error::custom(format!(
                    "invalid attendance flag: {other:?}"
                ))),
            },
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    fn person(name: &str, surname: &str) -> Person {
        Person {
            id: "1".into(),
            surname: surname.into(),
            family_name: "Martin".into(),
            name: name.into(),
            cellphone: "+33 6 12 34 56 78".into(),
            address: "12 Rue des Lilas".into(),
        }
    }

    fn record(attendance: Option<bool>) -> AttendanceRecord {
        AttendanceRecord {
            person_id: "1".into(),
            name: "Ana".into(),
            surname: "Lopez".into(),
            family_name: String::new(),
            id: None,
            attendance,
            date: None,
        }
    }

    #[test]
    fn person_accepts_numeric_id_and_null_fields() {
        let p: Person = serde_json::from_value(json!({
            "id": 42,
            "surname": "Dupont",
            "name": "Jean",
            "familyname": null,
            "cellphone": 600000000
        }))
        .unwrap();
        assert_eq!(p.id, "42");
        assert_eq!(p.family_name, "");
        assert_eq!(p.cellphone, "600000000");
        assert_eq!(p.address, "");
    }

    #[test]
    fn person_serializes_backend_field_names() {
        let value = serde_json::to_value(person("Jean", "Dupont")).unwrap();
        assert_eq!(value["familyname"], "Martin");
        assert!(value.get("family_name").is_none());
    }

    #[test]
    fn matches_is_case_insensitive_across_fields() {
        let p = person("Jean", "Dupont");
        assert!(p.matches("jean"));
        assert!(p.matches("dupo"));
        assert!(p.matches("martin"));
        assert!(p.matches("lilas"));
        assert!(p.matches("56 78"));
        assert!(!p.matches("zed"));
    }

    #[test]
    fn record_flag_accepts_bool_and_integer() {
        let records: Vec<AttendanceRecord> = serde_json::from_value(json!([
            {"person_id": "1", "attendance": true, "id": "9", "date": "2024-03-01"},
            {"person_id": 2, "attendance": 0, "id": 10},
            {"person_id": "3", "attendance": "1"},
            {"person_id": "4", "attendance": null, "id": null, "date": null}
        ]))
        .unwrap();
        assert_eq!(records[0].attendance, Some(true));
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(records[1].person_id, "2");
        assert_eq!(records[1].id.as_deref(), Some("10"));
        assert_eq!(records[1].attendance, Some(false));
        assert_eq!(records[2].attendance, Some(true));
        assert_eq!(records[3].attendance, None);
        assert!(!records[3].is_recorded());
    }

    #[test]
    fn unusable_dates_become_none() {
        let records: Vec<AttendanceRecord> = serde_json::from_value(json!([
            {"person_id": "1", "date": ""},
            {"person_id": "2", "date": "0000-00-00"},
            {"person_id": "3", "date": "2024-03-01 08:30:00"},
            {"person_id": "4", "date": 20_240_301}
        ]))
        .unwrap();
        assert_eq!(records[0].date, None);
        assert_eq!(records[1].date, None);
        assert_eq!(records[2].date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(records[3].date, None);
    }

    #[test]
    fn record_rejects_garbage_flag() {
        let res: Result<AttendanceRecord, _> =
            serde_json::from_value(json!({"person_id": "1", "attendance": "maybe"}));
        assert!(res.is_err());
    }

    #[test]
    fn stats_count_unmarked_as_absent() {
        let records = vec![
            record(Some(true)),
            record(Some(true)),
            record(Some(false)),
            record(None),
        ];
        let stats = AttendanceStats::from_records(&records);
        assert_eq!(stats.attended, 2);
        assert_eq!(stats.absent, 2);
        assert_eq!(stats.total(), records.len());
    }

    #[test]
    fn stats_of_empty_list_are_zero() {
        assert_eq!(AttendanceStats::from_records(&[]), AttendanceStats::default());
    }

    #[test]
    fn for_person_copies_display_fields() {
        let p = person("Jean", "Dupont");
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let r = AttendanceRecord::for_person(&p, date, true);
        assert_eq!(r.person_id, "1");
        assert_eq!(r.family_name, "Martin");
        assert_eq!(r.attendance, Some(true));
        assert_eq!(r.date, Some(date));
        assert!(!r.is_recorded());
    }
}
