//! Intent Parser
//!
//! Turns the rolling conversation into an ordered list of typed actions. The
//! primary path is one JSON-mode model call; any failure on that path (no
//! credential, transport error, malformed or empty output) degrades to the
//! deterministic rules in [`fallback`], which look only at the latest user
//! utterance and always produce exactly one action.

pub mod fallback;
pub mod prompt;

use crate::ai::{AiClient, Message, MessageRole};
use crate::contacts::ContactBook;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferAction {
    pub amount: Option<Decimal>,
    pub to_name: Option<String>,
    pub to_address: Option<String>,
    pub from_wallet: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceAction {
    pub from_wallet: Option<String>,
    pub target_wallets: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddContactAction {
    #[serde(rename = "to_name")]
    pub name: Option<String>,
    #[serde(rename = "to_address")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteContactAction {
    #[serde(rename = "to_name")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatAction {
    pub response_text: Option<String>,
}

/// One structured instruction extracted from user text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, strum::AsRefStr)]
#[serde(tag = "intent", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Action {
    Transfer(TransferAction),
    CheckBalance(BalanceAction),
    AddContact(AddContactAction),
    DeleteContact(DeleteContactAction),
    ListContacts,
    DeleteAllContacts,
    Greeting,
    Chat(ChatAction),
    /// Anything else, including the model's own "error" intent
    #[serde(other)]
    Unknown,
}

impl Action {
    /// Trim text fields and turn blank strings into `None`
    fn normalize(&mut self) {
        match self {
            Action::Transfer(t) => {
                clean(&mut t.to_name);
                clean(&mut t.to_address);
                clean(&mut t.from_wallet);
            }
            Action::CheckBalance(b) => {
                clean(&mut b.from_wallet);
                if let Some(targets) = b.target_wallets.as_mut() {
                    targets.retain(|w| !w.trim().is_empty());
                    for w in targets.iter_mut() {
                        *w = w.trim().to_string();
                    }
                }
            }
            Action::AddContact(c) => {
                clean(&mut c.name);
                clean(&mut c.address);
            }
            Action::DeleteContact(d) => clean(&mut d.name),
            Action::Chat(c) => {
                if c.response_text.as_deref().map(|t| t.trim().is_empty()).unwrap_or(false) {
                    c.response_text = None;
                }
            }
            Action::ListContacts | Action::DeleteAllContacts | Action::Greeting | Action::Unknown => {}
        }
    }
}

fn clean(field: &mut Option<String>) {
    *field = field
        .take()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
}

/// Parse the model's JSON document into actions. Accepts `{"actions": [...]}`
/// or a bare single action object.
pub fn parse_actions(raw: &str) -> Result<Vec<Action>, String> {
    let value: Value = serde_json::from_str(raw.trim())
        .map_err(|e| format!("model output is not JSON: {}", e))?;

    let mut actions: Vec<Action> = match value.get("actions") {
        Some(list @ Value::Array(_)) => serde_json::from_value(list.clone())
            .map_err(|e| format!("model actions do not match schema: {}", e))?,
        _ => vec![serde_json::from_value(value)
            .map_err(|e| format!("model action does not match schema: {}", e))?],
    };

    if actions.is_empty() {
        return Err("model returned an empty action list".to_string());
    }

    for action in actions.iter_mut() {
        action.normalize();
    }
    Ok(actions)
}

/// Fill in addresses the model left out for transfers naming a known contact
pub fn fill_contact_addresses(actions: &mut [Action], contacts: &ContactBook) {
    for action in actions.iter_mut() {
        if let Action::Transfer(transfer) = action {
            if transfer.to_address.is_some() {
                continue;
            }
            if let Some(address) = transfer.to_name.as_deref().and_then(|n| contacts.address_of(n)) {
                transfer.to_address = Some(address.to_string());
            }
        }
    }
}

/// Content of the most recent user turn
pub fn latest_user_utterance(history: &[Message]) -> &str {
    history
        .iter()
        .rev()
        .find(|m| m.role == MessageRole::User)
        .map(|m| m.content.as_str())
        .unwrap_or("")
}

pub struct IntentParser {
    client: Option<AiClient>,
}

impl IntentParser {
    pub fn new(client: Option<AiClient>) -> Self {
        Self { client }
    }

    pub fn is_model_backed(&self) -> bool {
        self.client.is_some()
    }

    /// Turn the transcript into one or more actions. Never fails.
    pub async fn parse(
        &self,
        history: &[Message],
        wallet_names: &[String],
        contacts: &ContactBook,
    ) -> Vec<Action> {
        let latest = latest_user_utterance(history);

        let client = match &self.client {
            Some(client) => client,
            None => {
                log::warn!("[INTENT] No model credential configured, using pattern rules");
                return vec![fallback::parse(latest, wallet_names, contacts)];
            }
        };

        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(prompt::build_system_prompt(wallet_names, contacts)));
        messages.extend(history.iter().cloned());

        let result = match client.generate_json(messages).await {
            Ok(raw) => parse_actions(&raw),
            Err(e) => Err(e.to_string()),
        };

        match result {
            Ok(mut actions) => {
                fill_contact_addresses(&mut actions, contacts);
                actions
            }
            Err(e) => {
                log::warn!("[INTENT] Model interpretation failed, falling back to pattern rules: {}", e);
                vec![fallback::parse(latest, wallet_names, contacts)]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AiError, MockAiClient};

    fn contacts() -> ContactBook {
        vec![("Farzi", "0xABC"), ("Ritika Edge", "0xDEF")].into_iter().collect()
    }

    fn wallets() -> Vec<String> {
        vec!["Main Ops".to_string(), "Reserve".to_string()]
    }

    fn mock_parser(responses: Vec<Result<String, AiError>>) -> (MockAiClient, IntentParser) {
        let mock = MockAiClient::new(responses);
        let parser = IntentParser::new(Some(AiClient::Mock(mock.clone())));
        (mock, parser)
    }

    #[test]
    fn test_parse_action_list() {
        let raw = r#"{"actions": [
            {"intent": "check_balance", "target_wallets": ["Reserve"], "amount": null},
            {"intent": "add_contact", "to_name": "Samay", "to_address": "0x123"}
        ]}"#;
        let actions = parse_actions(raw).unwrap();
        assert_eq!(
            actions,
            vec![
                Action::CheckBalance(BalanceAction {
                    from_wallet: None,
                    target_wallets: Some(vec!["Reserve".to_string()]),
                }),
                Action::AddContact(AddContactAction {
                    name: Some("Samay".to_string()),
                    address: Some("0x123".to_string()),
                }),
            ]
        );
    }

    #[test]
    fn test_single_object_is_wrapped() {
        let actions = parse_actions(r#"{"intent": "transfer", "amount": 12.5, "to_name": "Farzi"}"#).unwrap();
        assert_eq!(actions.len(), 1);
        match &actions[0] {
            Action::Transfer(t) => {
                assert_eq!(t.amount, Some(Decimal::new(125, 1)));
                assert_eq!(t.to_name.as_deref(), Some("Farzi"));
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_error_intent_maps_to_unknown() {
        let actions = parse_actions(r#"{"actions": [{"intent": "error"}]}"#).unwrap();
        assert_eq!(actions, vec![Action::Unknown]);
    }

    #[test]
    fn test_malformed_output_is_rejected() {
        assert!(parse_actions("Sure! Sending 5 to Farzi").is_err());
        assert!(parse_actions(r#"{"actions": []}"#).is_err());
        assert!(parse_actions(r#"{"actions": [{"amount": 5}]}"#).is_err());
    }

    #[test]
    fn test_blank_fields_become_none() {
        let actions = parse_actions(r#"{"intent": "transfer", "amount": 1, "to_name": "  ", "to_address": ""}"#).unwrap();
        assert_eq!(
            actions,
            vec![Action::Transfer(TransferAction {
                amount: Some(Decimal::ONE),
                ..Default::default()
            })]
        );
    }

    #[test]
    fn test_action_kind_names() {
        assert_eq!(Action::DeleteAllContacts.as_ref(), "delete_all_contacts");
        assert_eq!(Action::Transfer(TransferAction::default()).as_ref(), "transfer");
    }

    #[tokio::test]
    async fn test_model_result_gets_contact_address() {
        let (mock, parser) = mock_parser(vec![Ok(
            r#"{"actions": [{"intent": "transfer", "amount": 5, "to_name": "farzi"}]}"#.to_string(),
        )]);

        let history = vec![Message::user("send 5 to farzi")];
        let actions = parser.parse(&history, &wallets(), &contacts()).await;

        assert_eq!(
            actions,
            vec![Action::Transfer(TransferAction {
                amount: Some(Decimal::from(5)),
                to_name: Some("farzi".to_string()),
                to_address: Some("0xABC".to_string()),
                from_wallet: None,
            })]
        );

        // system prompt first, then the transcript
        let request = &mock.requests()[0];
        assert_eq!(request[0].role, MessageRole::System);
        assert_eq!(request[1], Message::user("send 5 to farzi"));
    }

    #[tokio::test]
    async fn test_model_failure_falls_back() {
        let (_mock, parser) = mock_parser(vec![Err(AiError::with_status("rate limited", 429))]);

        let history = vec![Message::user("hello there")];
        let actions = parser.parse(&history, &wallets(), &contacts()).await;
        assert_eq!(actions, vec![Action::Greeting]);
    }

    #[tokio::test]
    async fn test_non_json_falls_back() {
        let (_mock, parser) = mock_parser(vec![Ok("I think you want your balance".to_string())]);

        let history = vec![Message::user("check reserve balance")];
        let actions = parser.parse(&history, &wallets(), &contacts()).await;
        assert_eq!(
            actions,
            vec![Action::CheckBalance(BalanceAction {
                from_wallet: Some("Reserve".to_string()),
                target_wallets: Some(vec!["Reserve".to_string()]),
            })]
        );
    }

    #[tokio::test]
    async fn test_fallback_reads_latest_user_turn_only() {
        let parser = IntentParser::new(None);
        let history = vec![
            Message::user("send 5 to Farzi"),
            Message::assistant("Requesting confirmation for 5 USDT transfer"),
            Message::user("list my stuff"),
        ];
        let actions = parser.parse(&history, &wallets(), &contacts()).await;
        assert_eq!(actions, vec![Action::Unknown]);
    }
}
