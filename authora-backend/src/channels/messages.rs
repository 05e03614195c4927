//! Reply texts and keyboards shown to the operator.
//!
//! Telegram legacy Markdown: `*bold*`, `` `code` ``, `[label](url)`.

use super::types::{Button, Reply};
use crate::contacts::ContactBook;
use crate::web3::WalletBalance;
use rust_decimal::Decimal;

pub mod emoji {
    pub const SUCCESS: &str = "✅";
    pub const ERROR: &str = "❌";
    pub const WARNING: &str = "⚠️";
    pub const INFO: &str = "ℹ️";
    pub const TIP: &str = "💡";
    pub const SEARCH: &str = "🔍";
    pub const THINKING: &str = "💭";
    pub const LOADING: &str = "⏳";
    pub const WALLET: &str = "💰";
    pub const TOKEN: &str = "💵";
    pub const NATIVE: &str = "⚡";
    pub const TRANSACTION: &str = "💸";
    pub const GAS: &str = "⛽";
    pub const SEND: &str = "📤";
    pub const RECEIVE: &str = "📥";
    pub const DELETE: &str = "🗑️";
    pub const ADD: &str = "➕";
    pub const REFRESH: &str = "🔄";
    pub const LOCATION: &str = "📍";
    pub const CONTACTS: &str = "📇";
}

use emoji::*;

/// Callback data carried by the approve / cancel buttons
pub const CONFIRM_TX: &str = "confirm_tx";
pub const CANCEL_TX: &str = "cancel_tx";
pub const HELP_ADD_CONTACT: &str = "help_add_contact";
pub const HELP_DELETE_CONTACT: &str = "help_delete_contact";
pub const REFRESH_BALANCE: &str = "refresh_balance";
pub const SEND_FROM_PREFIX: &str = "send_";

/// "0x12345678...abcd"
pub fn short_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 14 {
        return address.to_string();
    }
    let head: String = chars[..10].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Text of the temporary message shown while a request is being interpreted
pub fn processing(text: &str) -> String {
    let lower = text.to_lowercase();
    let lead = if lower.contains("balance") || lower.contains("check") {
        WALLET
    } else if lower.contains("send") || lower.contains("transfer") {
        SEND
    } else if lower.contains("delete") || lower.contains("remove") {
        SEARCH
    } else {
        THINKING
    };
    format!("{} {} Processing...", lead, THINKING)
}

pub fn welcome() -> Reply {
    Reply::markdown(
        "👋 *Welcome to Authora*\n\n\
         Your BSC wallet assistant is ready.\n\
         Just tell me what you need in plain English.",
    )
    .with_row(vec![
        Button::new(format!("{} Add Contact", ADD), HELP_ADD_CONTACT),
        Button::new(format!("{} Delete Contact", DELETE), HELP_DELETE_CONTACT),
    ])
    .with_row(vec![Button::new(format!("{} Balance", REFRESH), REFRESH_BALANCE)])
}

pub fn help(token_symbol: &str) -> Reply {
    Reply::markdown(format!(
        "*Available Commands:*\n\n\
         Natural language: \"Send 10 {} to Bob\"\n\
         /balance [Wallet] - Check balance\n\
         /contacts - List contacts\n\
         /add_contact [Name] [0x...] - Manual add",
        token_symbol
    ))
}

pub fn not_understood() -> Reply {
    Reply::plain(format!(
        "{} I couldn't understand that part of the command.\n\n\
         Try:\n• \"Send 10 to Farzi\"\n• \"Check balance\"\n• \"List contacts\"",
        ERROR
    ))
}

pub fn missing_transfer_details(missing: &[&str]) -> Reply {
    Reply::markdown(format!(
        "{} *Missing Details*\n\nI need: {}\n\n{} Example: \"Send 10 to Farzi\"",
        ERROR,
        missing.join(" and "),
        TIP
    ))
}

pub fn ambiguous_recipient(candidates: &[String], amount: Decimal) -> Reply {
    Reply::markdown(format!(
        "🤔 *Multiple contacts found:*\n\n{}\n\n{} Please say:\n\"Send {} to [Specific Name]\"",
        bullet_list(candidates),
        TIP,
        amount
    ))
}

pub fn recipient_not_found(name: &str, suggestions: &[String]) -> Reply {
    let mut text = format!("{} Contact \"{}\" not found.\n\n", ERROR, name);
    if !suggestions.is_empty() {
        text.push_str(&format!("Did you mean:\n{}\n\n", bullet_list(suggestions)));
    }
    text.push_str(&format!("Add it first: \"Save {} 0x...\"", name));
    Reply::markdown(text)
}

pub fn no_wallets() -> Reply {
    Reply::plain(format!("{} No wallets are configured.", ERROR))
}

pub fn confirmation(
    amount: Decimal,
    token_symbol: &str,
    from_wallet: &str,
    display_name: &str,
    address: &str,
    native_symbol: &str,
) -> Reply {
    let text = format!(
        "╔═══════════════════════════╗\n\
         ║  {warn}  CONFIRM TRANSACTION   ║\n\
         ╠═══════════════════════════╣\n\
         ║\n\
         ║  {tx} Amount: {amount} {token}\n\
         ║  {send} From: {from}\n\
         ║  {recv} To: {to}\n\
         ║  {loc} {short}\n\
         ║\n\
         ║  {gas} Est. Gas: ~0.0003 {native}\n\
         ║\n\
         ╚═══════════════════════════╝",
        warn = WARNING,
        tx = TRANSACTION,
        amount = amount,
        token = token_symbol,
        send = SEND,
        from = from_wallet,
        recv = RECEIVE,
        to = display_name,
        loc = LOCATION,
        short = short_address(address),
        gas = GAS,
        native = native_symbol,
    );

    Reply::plain(text)
        .with_row(vec![Button::new(format!("{} APPROVE", SUCCESS), CONFIRM_TX)])
        .with_row(vec![Button::new(format!("{} CANCEL", ERROR), CANCEL_TX)])
}

pub fn balance(wallet_name: &str, balance: &WalletBalance) -> Reply {
    Reply::markdown(format!(
        "{} *{}*\n\nAddress: `{}`\n{} {}: *{}*\n{} {}: *{}*",
        WALLET,
        wallet_name,
        balance.address,
        TOKEN,
        balance.token_symbol,
        balance.token,
        NATIVE,
        balance.native_symbol,
        balance.native
    ))
}

pub fn balance_with_send_button(wallet_name: &str, wallet_balance: &WalletBalance) -> Reply {
    balance(wallet_name, wallet_balance).with_row(vec![Button::new(
        format!("{} Send from {}", SEND, wallet_name),
        format!("{}{}", SEND_FROM_PREFIX, wallet_name),
    )])
}

pub fn balance_error(wallet_name: &str, error: &str) -> Reply {
    Reply::markdown(format!("{} *Error checking {}*\n\n{}", ERROR, wallet_name, error))
}

pub fn command_error(error: &str) -> Reply {
    Reply::plain(format!("{} Error: {}", ERROR, error))
}

pub fn contact_saved(name: &str) -> Reply {
    Reply::markdown(format!("{} Contact *{}* saved.", SUCCESS, name))
}

pub fn contact_details_missing() -> Reply {
    Reply::markdown(format!("{} *Missing Details*\n\nI need both name and address.", ERROR))
}

pub fn add_contact_usage() -> Reply {
    Reply::plain(format!("{} Usage: /add_contact [Name] [0xAddress]", ERROR))
}

pub fn contact_list(book: &ContactBook) -> Reply {
    let mut text = format!("{} *Saved Contacts* ({})\n\n", CONTACTS, book.len());
    if book.is_empty() {
        text.push_str(&format!(
            "{} No contacts saved yet.\n\n{} Add one with: \"Save [Name] [Address]\"",
            INFO, TIP
        ));
    } else {
        for (name, address) in book.iter() {
            text.push_str(&format!("{} *{}*\n   `{}`\n\n", LOCATION, name, address));
        }
    }
    Reply::markdown(text.trim_end().to_string())
}

pub fn contacts_cleared() -> Reply {
    Reply::markdown(format!("{} *Address Book Cleared*", SUCCESS))
}

pub fn contact_deleted(name: &str) -> Reply {
    Reply::markdown(format!("{} *Deleted:* {}", SUCCESS, name))
}

pub fn delete_failed() -> Reply {
    Reply::plain(format!("{} Error deleting contact.", ERROR))
}

pub fn ambiguous_delete(candidates: &[String]) -> Reply {
    Reply::markdown(format!(
        "🤔 *Multiple contacts found:*\n\n{}\n\n{} Please say: \"Delete [Specific Name]\"",
        bullet_list(candidates),
        TIP
    ))
}

pub fn delete_not_found(name: &str) -> Reply {
    Reply::markdown(format!("{} Contact *{}* not found.", ERROR, name))
}

pub fn delete_target_missing() -> Reply {
    Reply::plain(format!("{} I don't know who to delete.", ERROR))
}

pub fn chat(text: &str) -> Reply {
    Reply::markdown(format!("{} {}", INFO, text))
}

pub fn initiating() -> Reply {
    Reply::markdown(format!("{} *Initiating transaction...*\n\nPlease wait...", LOADING))
}

pub fn receipt(amount: Decimal, token_symbol: &str, from_wallet: &str, to: &str, explorer_url: &str) -> Reply {
    Reply::markdown(format!(
        "{} *Transaction Successful*\n\n\
         Amount: *{} {}*\n\
         From: *{}*\n\
         To: *{}*\n\n\
         [View Transaction]({})",
        SUCCESS, amount, token_symbol, from_wallet, to, explorer_url
    ))
    .without_preview()
}

pub fn transfer_failed(reason: &str) -> Reply {
    Reply::markdown(format!(
        "{} *Transaction Failed*\n\nReason: {}\n\nTry again or check your balance.",
        ERROR, reason
    ))
}

pub fn superseded() -> Reply {
    Reply::markdown(format!(
        "{} *Superseded*\n\nA newer transfer request replaced this one.",
        INFO
    ))
}

pub fn cancelled() -> Reply {
    Reply::markdown(format!(
        "{} *Operation Cancelled*\n\nTransaction was aborted by user.",
        ERROR
    ))
}

pub fn help_add_contact() -> Reply {
    Reply::markdown(format!(
        "{} *Add Contact*\n\n{} Simply say:\n\"Save [Name] [0xAddress]\"\n\nExample: \"Save Farzi 0xD199...\"",
        ADD, TIP
    ))
}

pub fn help_delete_contact() -> Reply {
    Reply::markdown(format!(
        "{} *Delete Contact*\n\n{} Simply say:\n\"Delete [Name]\"\n\nExample: \"Delete Farzi\"",
        DELETE, TIP
    ))
}

pub fn refresh_balance_hint() -> Reply {
    Reply::plain(format!("{} Say: \"Check balance\" or specify a wallet!", TIP))
}

pub fn send_from_hint(wallet_name: &str) -> Reply {
    Reply::markdown(format!(
        "{} *Send from {}*\n\n{} Say:\n\"Send [amount] to [name] from {}\"",
        SEND, wallet_name, TIP, wallet_name
    ))
}

pub fn system_error(error: &str) -> Reply {
    Reply::plain(format!("System Error: {}", error))
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|i| format!("• {}", i))
        .collect::<Vec<_>>()
        .join("\n")
}
