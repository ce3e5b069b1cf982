//! Tipos de dados para as requisições e respostas da API REST v2 do Jira.
//!
//! Apenas os campos usados pela progressão de issues são modelados; campos
//! extras enviados pelo servidor são ignorados pelo `serde`.

use serde::{Deserialize, Deserializer, Serialize};

/// Referência a uma issue retornada por busca JQL ou consulta direta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRef {
    /// Chave legível da issue (ex.: "ABC-42").
    pub key: String,
    /// Identificador numérico interno, enviado como string pelo Jira.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub fields: Option<IssueFields>,
}

impl IssueRef {
    /// Cria uma referência contendo apenas a chave.
    #[cfg(test)]
    pub fn from_key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            id: None,
            fields: None,
        }
    }

    /// Nome do status atual, quando o servidor o incluiu na resposta.
    pub fn status_name(&self) -> Option<&str> {
        self.fields
            .as_ref()
            .and_then(|f| f.status.as_ref())
            .map(|s| s.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueFields {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub status: Option<StatusField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusField {
    pub name: String,
}

/// Corpo da resposta de `GET /rest/api/2/search`.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub issues: Vec<IssueRef>,
    #[serde(default)]
    pub total: Option<u64>,
}

/// Ação de workflow disponível para uma issue no momento da consulta.
///
/// O nome pode vir ausente ou `null`; nesse caso a ação nunca casa com um
/// nome pedido.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionCandidate {
    #[serde(deserialize_with = "numeric_id")]
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
}

#[cfg(test)]
impl TransitionCandidate {
    pub fn new(id: u64, name: Option<&str>) -> Self {
        Self {
            id,
            name: name.map(str::to_string),
        }
    }
}

/// Corpo da resposta de `GET /rest/api/2/issue/{key}/transitions`.
#[derive(Debug, Clone, Deserialize)]
pub struct TransitionsResponse {
    #[serde(default)]
    pub transitions: Vec<TransitionCandidate>,
}

/// Corpo de `POST /rest/api/2/issue/{key}/transitions`.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionRequest {
    pub transition: TransitionRef,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransitionRef {
    pub id: String,
}

impl TransitionRequest {
    pub fn new(id: u64) -> Self {
        Self {
            transition: TransitionRef { id: id.to_string() },
        }
    }
}

/// Corpo de `POST /rest/api/2/issue/{key}/comment`.
///
/// `visibility` só é serializado quando existe restrição; sem ele o
/// comentário é público.
#[derive(Debug, Clone, Serialize)]
pub struct CommentRequest {
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
}

impl CommentRequest {
    /// Monta o corpo do comentário. Grupo tem precedência sobre papel.
    pub fn new(body: &str, group: Option<&str>, role: Option<&str>) -> Self {
        let visibility = match (non_blank(group), non_blank(role)) {
            (Some(group), _) => Some(Visibility {
                kind: VisibilityKind::Group,
                value: group.to_string(),
            }),
            (None, Some(role)) => Some(Visibility {
                kind: VisibilityKind::Role,
                value: role.to_string(),
            }),
            (None, None) => None,
        };
        Self {
            body: body.to_string(),
            visibility,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Visibility {
    #[serde(rename = "type")]
    pub kind: VisibilityKind,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityKind {
    Group,
    Role,
}

/// Corpo de erro padrão do Jira (`errorMessages` + `errors`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    #[serde(default)]
    pub error_messages: Vec<String>,
    #[serde(default)]
    pub errors: std::collections::BTreeMap<String, String>,
}

impl ErrorBody {
    /// Junta todas as mensagens em uma linha; `None` se o corpo veio vazio.
    pub fn summary(&self) -> Option<String> {
        let parts: Vec<String> = self
            .error_messages
            .iter()
            .cloned()
            .chain(self.errors.iter().map(|(field, msg)| format!("{field}: {msg}")))
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("; "))
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

// O Jira envia ids de transição como string ("11"), mas alguns proxies e
// versões antigas mandam número.
fn numeric_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    match RawId::deserialize(deserializer)? {
        RawId::Number(n) => Ok(n),
        RawId::Text(s) => s
            .trim()
            .parse::<u64>()
            .map_err(|_| serde::de::Error::custom(format!("transition id is not numeric: {s:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions_response_deserialize_from_api_format() {
        let json = r#"{
            "expand": "transitions",
            "transitions": [
                {"id": "11", "name": "To Do", "to": {"name": "Open"}},
                {"id": 21, "name": null},
                {"id": "31"}
            ]
        }"#;
        let resp: TransitionsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.transitions.len(), 3);
        assert_eq!(resp.transitions[0], TransitionCandidate::new(11, Some("To Do")));
        assert_eq!(resp.transitions[1], TransitionCandidate::new(21, None));
        assert_eq!(resp.transitions[2], TransitionCandidate::new(31, None));
    }

    #[test]
    fn non_numeric_transition_id_is_rejected() {
        let json = r#"{"transitions": [{"id": "abc", "name": "Done"}]}"#;
        assert!(serde_json::from_str::<TransitionsResponse>(json).is_err());
    }

    #[test]
    fn search_response_deserialize_from_api_format() {
        let json = r#"{
            "startAt": 0,
            "maxResults": 50,
            "total": 2,
            "issues": [
                {"id": "10001", "key": "ABC-1", "fields": {"summary": "First", "status": {"name": "Open"}}},
                {"id": "10002", "key": "ABC-2"}
            ]
        }"#;
        let resp: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.total, Some(2));
        assert_eq!(resp.issues[0].key, "ABC-1");
        assert_eq!(resp.issues[0].status_name(), Some("Open"));
        assert_eq!(resp.issues[1].status_name(), None);
    }

    #[test]
    fn transition_request_sends_id_as_string() {
        let json = serde_json::to_value(TransitionRequest::new(42)).unwrap();
        assert_eq!(json, serde_json::json!({"transition": {"id": "42"}}));
    }

    #[test]
    fn unrestricted_comment_omits_visibility() {
        let json = serde_json::to_value(CommentRequest::new("hello", None, Some("  "))).unwrap();
        assert_eq!(json, serde_json::json!({"body": "hello"}));
    }

    #[test]
    fn group_visibility_wins_over_role() {
        let json =
            serde_json::to_value(CommentRequest::new("hi", Some("jira-devs"), Some("Developers")))
                .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"body": "hi", "visibility": {"type": "group", "value": "jira-devs"}})
        );

        let json = serde_json::to_value(CommentRequest::new("hi", None, Some("Developers"))).unwrap();
        assert_eq!(json["visibility"]["type"], "role");
    }

    #[test]
    fn error_body_summary_joins_messages() {
        let body: ErrorBody = serde_json::from_str(
            r#"{"errorMessages": ["Issue does not exist"], "errors": {"transition": "invalid"}}"#,
        )
        .unwrap();
        assert_eq!(
            body.summary().as_deref(),
            Some("Issue does not exist; transition: invalid")
        );
        assert!(ErrorBody::default().summary().is_none());
    }
}
