use async_trait::async_trait;
use attendance_sdk::{ApiError, NewPerson, PeopleApi, Person};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::transport::ApiTransport;

/// Words that mark a plain-text reply to a create call as an acknowledgement.
const ACK_KEYWORDS: [&str; 3] = ["success", "created", "added"];

/// [`PeopleApi`] over the `?param=people` / `?param=person` endpoints.
#[derive(Clone)]
pub struct PeopleClient {
    transport: ApiTransport,
}

impl PeopleClient {
    #[must_use]
    pub fn new(transport: ApiTransport) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl PeopleApi for PeopleClient {
    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<Person>, ApiError> {
        let url = self.transport.endpoint("people", &[]);
        let Value::Array(items) = self.transport.get_json(&url).await? else {
            return Err(ApiError::invalid_response(
                "Invalid response format: Expected an array of people",
            ));
        };

        let people = items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                if !has_required_fields(&item) {
                    return Err(ApiError::invalid_person_data(index));
                }
                serde_json::from_value::<Person>(item)
                    .map_err(|_| ApiError::invalid_person_data(index))
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(count = people.len(), "fetched people");
        Ok(people)
    }

    async fn search(&self, query: &str) -> Result<Vec<Person>, ApiError> {
        let people = self.list().await?;
        let term = query.trim().to_lowercase();
        if term.is_empty() {
            return Ok(people);
        }
        Ok(people.into_iter().filter(|p| p.matches(&term)).collect())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Person>, ApiError> {
        Ok(self.list().await?.into_iter().find(|p| p.id == id))
    }

    #[instrument(skip_all, fields(surname = %person.surname))]
    async fn create(&self, person: &NewPerson) -> Result<Person, ApiError> {
        let url = self.transport.endpoint("person", &[]);
        let reply = self.transport.post_for_text(&url, person).await?;

        let text = reply.body.trim();
        if text.is_empty() {
            warn!("empty reply to create person, echoing submitted person");
            return Ok(Person::from_new("", person));
        }

        match serde_json::from_str::<Value>(text) {
            Ok(value) => Ok(person_from_reply(value, person)),
            Err(_) if is_acknowledgement(text) => {
                warn!(reply = %text, "non-JSON acknowledgement to create person");
                Ok(Person::from_new("", person))
            }
            Err(_) => Err(ApiError::invalid_response(format!(
                "Server returned non-JSON response: {text}"
            ))
            .with_status(reply.status.as_u16())),
        }
    }
}

/// `id`, `surname` and `name` must all be set: not missing, null, false,
/// an empty string or zero.
fn has_required_fields(item: &Value) -> bool {
    let present = |key: &str| match item.get(key) {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f.abs() > 0.0),
        Some(Value::Array(_) | Value::Object(_)) => true,
    };
    present("id") && present("surname") && present("name")
}

fn is_acknowledgement(text: &str) -> bool {
    let lower = text.to_lowercase();
    ACK_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// A full person record is taken as-is; any other JSON (for example
/// `{"success":true,"id":7}`) echoes the submitted person with the id the
/// reply carries, if any.
fn person_from_reply(value: Value, submitted: &NewPerson) -> Person {
    let id = match value.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    if has_required_fields(&value)
        && let Ok(person) = serde_json::from_value::<Person>(value)
    {
        return person;
    }
    debug!(id = %id, "create reply is not a person record, echoing submitted person");
    Person::from_new(id, submitted)
}
