//! Pattern rules used when the model path is unavailable.
//!
//! Only the latest user utterance is inspected and exactly one action comes
//! out. Rules are tried in a fixed order and the first hit wins.

use super::{Action, BalanceAction, DeleteContactAction, TransferAction};
use crate::contacts::ContactBook;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

static GREETING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(hi|hey|hello|start|help|menu)").unwrap());

// Matched against the original text so the recipient keeps its casing
static TRANSFER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:send|transfer)\s+([\d.]+).*to\s+(\w+)").unwrap());

static DELETE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:delete|remove)\s+(.+)").unwrap());

static ALL_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^all\b").unwrap());

/// Address prefix of the target chain
const ADDRESS_PREFIX: &str = "0x";

pub fn parse(utterance: &str, wallet_names: &[String], contacts: &ContactBook) -> Action {
    let original = utterance.trim();
    let msg = original.to_lowercase();

    if msg.is_empty() {
        return Action::Unknown;
    }

    if GREETING_RE.is_match(&msg) {
        return Action::Greeting;
    }

    if let Some(caps) = TRANSFER_RE.captures(original) {
        let amount = Decimal::from_str(&caps[1]).ok();
        let to_name = caps[2].to_string();
        let to_address = contacts
            .address_of(&to_name)
            .map(String::from)
            .or_else(|| {
                to_name
                    .to_lowercase()
                    .starts_with(ADDRESS_PREFIX)
                    .then(|| to_name.clone())
            });

        return Action::Transfer(TransferAction {
            amount,
            to_name: Some(to_name),
            to_address,
            from_wallet: mentioned_wallet(&msg, wallet_names)
                .or_else(|| wallet_names.first().cloned()),
        });
    }

    if msg.contains("balance") || msg.contains("check") {
        let wallet = mentioned_wallet(&msg, wallet_names);
        return Action::CheckBalance(BalanceAction {
            target_wallets: wallet.clone().map(|w| vec![w]),
            from_wallet: wallet,
        });
    }

    if let Some(caps) = DELETE_RE.captures(&msg) {
        let target = &caps[1];
        if !ALL_WORD_RE.is_match(target) {
            let name = target
                .replacen("from contacts", "", 1)
                .replacen("address", "", 1)
                .trim()
                .to_string();
            return Action::DeleteContact(DeleteContactAction {
                name: Some(name).filter(|n| !n.is_empty()),
            });
        }
    }

    if msg.contains("delete all") || msg.contains("clear contacts") {
        return Action::DeleteAllContacts;
    }

    Action::Unknown
}

/// First wallet, in enumeration order, whose name appears in the message
fn mentioned_wallet(msg: &str, wallet_names: &[String]) -> Option<String> {
    wallet_names
        .iter()
        .find(|w| msg.contains(&w.to_lowercase()))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallets() -> Vec<String> {
        vec!["Main Ops".to_string(), "Reserve".to_string(), "Main".to_string()]
    }

    fn contacts() -> ContactBook {
        vec![("Farzi", "0xABC")].into_iter().collect()
    }

    #[test]
    fn test_greeting() {
        assert_eq!(parse("Hello bot", &wallets(), &contacts()), Action::Greeting);
        assert_eq!(parse("menu", &wallets(), &contacts()), Action::Greeting);
    }

    #[test]
    fn test_transfer_to_contact() {
        let action = parse("send 5 to Farzi", &wallets(), &contacts());
        assert_eq!(
            action,
            Action::Transfer(TransferAction {
                amount: Some(Decimal::from(5)),
                to_name: Some("Farzi".to_string()),
                to_address: Some("0xABC".to_string()),
                from_wallet: Some("Main Ops".to_string()),
            })
        );
    }

    #[test]
    fn test_transfer_to_literal_address_from_wallet() {
        let action = parse("Transfer 2.5 usdt to 0xdead from reserve", &wallets(), &contacts());
        assert_eq!(
            action,
            Action::Transfer(TransferAction {
                amount: Some(Decimal::new(25, 1)),
                to_name: Some("0xdead".to_string()),
                to_address: Some("0xdead".to_string()),
                from_wallet: Some("Reserve".to_string()),
            })
        );
    }

    #[test]
    fn test_unknown_recipient_has_no_address() {
        match parse("send 10 to nobody", &wallets(), &contacts()) {
            Action::Transfer(t) => {
                assert_eq!(t.to_name.as_deref(), Some("nobody"));
                assert_eq!(t.to_address, None);
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_wallet_scan_uses_enumeration_order() {
        // "Main Ops" and "Main" both appear; the earlier entry wins
        let action = parse("check main ops balance", &wallets(), &contacts());
        assert_eq!(
            action,
            Action::CheckBalance(BalanceAction {
                from_wallet: Some("Main Ops".to_string()),
                target_wallets: Some(vec!["Main Ops".to_string()]),
            })
        );
    }

    #[test]
    fn test_balance_without_wallet() {
        assert_eq!(
            parse("what's my balance", &wallets(), &contacts()),
            Action::CheckBalance(BalanceAction::default())
        );
    }

    #[test]
    fn test_delete_contact_strips_phrases() {
        assert_eq!(
            parse("Delete Samay from contacts", &wallets(), &contacts()),
            Action::DeleteContact(DeleteContactAction { name: Some("samay".to_string()) })
        );
        assert_eq!(
            parse("remove farzi address", &wallets(), &contacts()),
            Action::DeleteContact(DeleteContactAction { name: Some("farzi".to_string()) })
        );
    }

    #[test]
    fn test_delete_all() {
        assert_eq!(parse("delete all", &wallets(), &contacts()), Action::DeleteAllContacts);
        assert_eq!(parse("please clear contacts", &wallets(), &contacts()), Action::DeleteAllContacts);
        // a name that merely starts with "all" is still a single delete
        assert_eq!(
            parse("delete allison", &wallets(), &contacts()),
            Action::DeleteContact(DeleteContactAction { name: Some("allison".to_string()) })
        );
    }

    #[test]
    fn test_unknown() {
        assert_eq!(parse("what is the weather", &wallets(), &contacts()), Action::Unknown);
        assert_eq!(parse("   ", &wallets(), &contacts()), Action::Unknown);
    }
}
