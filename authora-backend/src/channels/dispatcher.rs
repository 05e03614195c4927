//! Conversation Orchestrator
//!
//! Owns the operator session and drives every inbound message through the
//! intent parser, then processes the resulting actions one at a time. The
//! session lock is held for the whole of one message or button press, so
//! updates are handled strictly in arrival order. The session state is also
//! published through a watch channel so readers never wait on that lock.

use super::messages;
use super::session::{PendingTransaction, Session, SessionState};
use super::types::{ChatTransport, Reply, SentMessage};
use crate::ai::Message;
use crate::contacts::{self, ContactStore, Resolution};
use crate::intent::{
    Action, AddContactAction, BalanceAction, DeleteContactAction, IntentParser, TransferAction,
};
use crate::wallet::WalletRegistry;
use crate::web3::{parse_address, ChainExecutor};
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

pub struct MessageDispatcher {
    parser: IntentParser,
    contacts: Arc<ContactStore>,
    wallets: Arc<WalletRegistry>,
    executor: Arc<dyn ChainExecutor>,
    session: Mutex<Session>,
    /// Mirrors the session state so observers never wait on the session lock
    state: watch::Sender<SessionState>,
}

impl MessageDispatcher {
    pub fn new(
        parser: IntentParser,
        contacts: Arc<ContactStore>,
        wallets: Arc<WalletRegistry>,
        executor: Arc<dyn ChainExecutor>,
    ) -> Self {
        Self {
            parser,
            contacts,
            wallets,
            executor,
            session: Mutex::new(Session::new()),
            state: watch::channel(SessionState::Idle).0,
        }
    }

    /// Last published session state; does not wait for in-flight work
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    fn publish(&self, session: &Session) {
        self.state.send_replace(session.state());
    }

    #[cfg(test)]
    pub async fn pending(&self) -> Option<PendingTransaction> {
        self.session.lock().await.pending().cloned()
    }

    #[cfg(test)]
    pub async fn history(&self) -> Vec<Message> {
        self.session.lock().await.history.turns()
    }

    /// Dispatch with errors and panics reported to the operator instead of
    /// propagating.
    pub async fn dispatch_safe(&self, text: &str, transport: &dyn ChatTransport) {
        use futures_util::FutureExt;
        use std::panic::AssertUnwindSafe;

        let error = match AssertUnwindSafe(self.dispatch(text, transport)).catch_unwind().await {
            Ok(Ok(())) => return,
            Ok(Err(e)) => {
                log::error!("[DISPATCH] Message handling failed: {}", e);
                e
            }
            Err(panic_info) => {
                let panic_msg = panic_message(&*panic_info);
                log::error!("[DISPATCH] PANIC during dispatch: {}", panic_msg);
                format!("Internal error (panic): {}", panic_msg)
            }
        };

        if let Err(e) = transport.send(messages::system_error(&error)).await {
            log::error!("[DISPATCH] Failed to report error to operator: {}", e);
        }
    }

    /// Handle one inbound text message
    pub async fn dispatch(&self, text: &str, transport: &dyn ChatTransport) -> Result<(), String> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        let mut session = self.session.lock().await;

        if let Some(command) = parse_command(text) {
            if self.handle_command(&command, transport).await? {
                return Ok(());
            }
        }

        session.history.push(Message::user(text));

        let waiting = transport.send(Reply::plain(messages::processing(text))).await?;

        let parsed: Result<Vec<Action>, String> = async {
            let wallet_names = self.wallets.names();
            let book = self.contacts.get()?;
            let history = session.history.turns();
            Ok::<_, String>(self.parser.parse(&history, &wallet_names, &book).await)
        }
        .await;

        // removed on every path, including a failed parse
        if let Err(e) = transport.delete(waiting).await {
            log::warn!("[DISPATCH] Failed to delete processing message: {}", e);
        }
        let actions = parsed?;

        log::debug!(
            "[DISPATCH] Parsed actions: {}",
            serde_json::to_string(&actions).unwrap_or_default()
        );

        for action in &actions {
            log::info!("[DISPATCH] Processing action '{}'", action.as_ref());
            if let Some(note) = self.process_action(&mut session, action, transport).await? {
                session.history.push(Message::assistant(note));
            }
        }

        Ok(())
    }

    /// Run one action, returning the condensed history note for its reply
    async fn process_action(
        &self,
        session: &mut Session,
        action: &Action,
        transport: &dyn ChatTransport,
    ) -> Result<Option<String>, String> {
        match action {
            Action::Unknown => {
                transport.send(messages::not_understood()).await?;
                Ok(Some("I couldn't understand that part of the command.".to_string()))
            }
            Action::Transfer(transfer) => self.stage_transfer(session, transfer, transport).await,
            Action::CheckBalance(balance) => self.check_balance(balance, transport).await,
            Action::AddContact(add) => self.add_contact(add, transport).await,
            Action::DeleteContact(delete) => self.delete_contact(delete, transport).await,
            Action::ListContacts => {
                let book = self.contacts.get()?;
                transport.send(messages::contact_list(&book)).await?;
                Ok(Some("Listed all contacts".to_string()))
            }
            Action::DeleteAllContacts => {
                self.contacts.clear()?;
                transport.send(messages::contacts_cleared()).await?;
                Ok(Some("Cleared all contacts".to_string()))
            }
            Action::Greeting => {
                transport.send(messages::welcome()).await?;
                Ok(Some("Sent greeting".to_string()))
            }
            Action::Chat(chat) => match chat.response_text.as_deref() {
                Some(text) => {
                    transport.send(messages::chat(text)).await?;
                    Ok(Some(text.to_string()))
                }
                None => Ok(None),
            },
        }
    }

    async fn stage_transfer(
        &self,
        session: &mut Session,
        transfer: &TransferAction,
        transport: &dyn ChatTransport,
    ) -> Result<Option<String>, String> {
        let amount = transfer.amount.filter(|a| *a > Decimal::ZERO);
        let has_recipient = transfer.to_address.is_some() || transfer.to_name.is_some();

        let amount = match amount {
            Some(amount) if has_recipient => amount,
            amount => {
                let mut missing = Vec::new();
                if amount.is_none() {
                    missing.push("Amount");
                }
                if !has_recipient {
                    missing.push("Recipient");
                }
                log::info!("[DISPATCH] Transfer validation failed, missing {:?}", missing);
                transport.send(messages::missing_transfer_details(&missing)).await?;
                return Ok(Some("Missing transfer details".to_string()));
            }
        };

        let (to, display_name) = match &transfer.to_address {
            Some(address) => {
                let display = transfer.to_name.clone().unwrap_or_else(|| address.clone());
                (address.clone(), display)
            }
            None => {
                let name = transfer.to_name.clone().unwrap_or_default();
                if parse_address(&name).is_some() {
                    (name.clone(), name)
                } else {
                    let book = self.contacts.get()?;
                    match contacts::resolve(&name, &book) {
                        Resolution::Exact(key) => match book.address_of(&key) {
                            Some(address) => (address.to_string(), key),
                            None => {
                                transport.send(messages::recipient_not_found(&name, &[])).await?;
                                return Ok(Some(format!("Unknown recipient {}", name)));
                            }
                        },
                        Resolution::Ambiguous(candidates) => {
                            transport.send(messages::ambiguous_recipient(&candidates, amount)).await?;
                            return Ok(Some("Asked for clarification on transfer recipient".to_string()));
                        }
                        Resolution::NotFound => {
                            let suggestions = contacts::suggest(&name, &book);
                            transport.send(messages::recipient_not_found(&name, &suggestions)).await?;
                            return Ok(Some(format!("Unknown recipient {}", name)));
                        }
                    }
                }
            }
        };

        let from_wallet = match transfer
            .from_wallet
            .clone()
            .or_else(|| self.wallets.default_name().map(String::from))
        {
            Some(wallet) => wallet,
            None => {
                transport.send(messages::no_wallets()).await?;
                return Ok(Some("No source wallet configured".to_string()));
            }
        };

        let token_symbol = self.executor.token_symbol().to_string();
        let prompt = messages::confirmation(
            amount,
            &token_symbol,
            &from_wallet,
            &display_name,
            &to,
            self.executor.native_symbol(),
        );

        log::info!(
            "[DISPATCH] Staging transfer of {} {} from {} to {} ({})",
            amount, token_symbol, from_wallet, display_name, to
        );
        let sent = transport.send(prompt).await?;
        let replaced = session.stage(
            PendingTransaction {
                to,
                amount,
                from_wallet,
                display_name,
            },
            Some(sent),
        );
        self.publish(session);

        if let Some(old_prompt) = replaced {
            log::info!("[DISPATCH] Pending transfer replaced by a newer request");
            if let Err(e) = transport.edit(old_prompt, messages::superseded()).await {
                log::warn!("[DISPATCH] Failed to mark old confirmation as superseded: {}", e);
            }
        }
        Ok(Some(format!("Requesting confirmation for {} {} transfer", amount, token_symbol)))
    }

    async fn check_balance(
        &self,
        request: &BalanceAction,
        transport: &dyn ChatTransport,
    ) -> Result<Option<String>, String> {
        let targets: Vec<String> = match (&request.target_wallets, &request.from_wallet) {
            (Some(targets), _) if !targets.is_empty() => targets.clone(),
            (_, Some(wallet)) => vec![wallet.clone()],
            _ => match self.wallets.default_name() {
                Some(wallet) => vec![wallet.to_string()],
                None => {
                    transport.send(messages::no_wallets()).await?;
                    return Ok(Some("No wallets configured".to_string()));
                }
            },
        };

        let mut notes = Vec::with_capacity(targets.len());
        for wallet_name in &targets {
            let result = match self.wallets.resolve(wallet_name) {
                Ok(secret) => self.executor.get_balance(secret).await,
                Err(e) => Err(e.to_string()),
            };

            match result {
                Ok(balance) => {
                    transport
                        .send(messages::balance_with_send_button(wallet_name, &balance))
                        .await?;
                    notes.push(format!("Checked balance for {}", wallet_name));
                }
                Err(e) => {
                    log::warn!("[DISPATCH] Balance check for {} failed: {}", wallet_name, e);
                    transport.send(messages::balance_error(wallet_name, &e)).await?;
                    notes.push(format!("Error checking {}", wallet_name));
                }
            }
        }

        Ok(Some(notes.join("; ")))
    }

    async fn add_contact(
        &self,
        request: &AddContactAction,
        transport: &dyn ChatTransport,
    ) -> Result<Option<String>, String> {
        match (&request.name, &request.address) {
            (Some(name), Some(address)) => {
                self.contacts.add(name, address)?;
                transport.send(messages::contact_saved(name)).await?;
                Ok(Some(format!("Saved contact {}", name)))
            }
            _ => {
                transport.send(messages::contact_details_missing()).await?;
                Ok(Some("Missing contact details".to_string()))
            }
        }
    }

    async fn delete_contact(
        &self,
        request: &DeleteContactAction,
        transport: &dyn ChatTransport,
    ) -> Result<Option<String>, String> {
        let name = match &request.name {
            Some(name) => name,
            None => {
                transport.send(messages::delete_target_missing()).await?;
                return Ok(Some("Missing delete target".to_string()));
            }
        };

        let book = self.contacts.get()?;
        match contacts::resolve(name, &book) {
            Resolution::Exact(key) => {
                if self.contacts.remove(&key)? {
                    transport.send(messages::contact_deleted(&key)).await?;
                    Ok(Some(format!("Deleted contact {}", key)))
                } else {
                    transport.send(messages::delete_failed()).await?;
                    Ok(Some("Delete failed".to_string()))
                }
            }
            Resolution::Ambiguous(candidates) => {
                transport.send(messages::ambiguous_delete(&candidates)).await?;
                Ok(Some(format!("Asked for clarification on {}", name)))
            }
            Resolution::NotFound => {
                transport.send(messages::delete_not_found(name)).await?;
                Ok(Some(format!("Contact {} not found", name)))
            }
        }
    }

    /// Slash commands answered without the parser. Returns false for
    /// commands this bot does not know, which then go through the parser.
    async fn handle_command(&self, command: &Command, transport: &dyn ChatTransport) -> Result<bool, String> {
        log::info!("[DISPATCH] Command /{}", command.name);
        match command.name.as_str() {
            "start" => {
                transport.send(messages::welcome()).await?;
            }
            "help" => {
                transport.send(messages::help(self.executor.token_symbol())).await?;
            }
            "contacts" => {
                let book = self.contacts.get()?;
                transport.send(messages::contact_list(&book)).await?;
            }
            "add_contact" => match command.args.as_slice() {
                [name, address] => {
                    self.contacts.add(name, address)?;
                    transport.send(messages::contact_saved(name)).await?;
                }
                _ => {
                    transport.send(messages::add_contact_usage()).await?;
                }
            },
            "balance" => {
                let requested = command.args.join(" ");
                let wallet_name = if requested.is_empty() {
                    match self.wallets.default_name() {
                        Some(name) => name.to_string(),
                        None => {
                            transport.send(messages::no_wallets()).await?;
                            return Ok(true);
                        }
                    }
                } else {
                    requested
                };

                let result = match self.wallets.resolve(&wallet_name) {
                    Ok(secret) => self.executor.get_balance(secret).await,
                    Err(e) => Err(e.to_string()),
                };
                match result {
                    Ok(balance) => {
                        transport.send(messages::balance(&wallet_name, &balance)).await?;
                    }
                    Err(e) => {
                        transport.send(messages::command_error(&e)).await?;
                    }
                }
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Button press handling with errors and panics reported to the operator
    pub async fn handle_callback_safe(
        &self,
        data: &str,
        origin: Option<SentMessage>,
        transport: &dyn ChatTransport,
    ) {
        use futures_util::FutureExt;
        use std::panic::AssertUnwindSafe;

        let error = match AssertUnwindSafe(self.handle_callback(data, origin, transport))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => return,
            Ok(Err(e)) => {
                log::error!("[DISPATCH] Callback '{}' failed: {}", data, e);
                e
            }
            Err(panic_info) => {
                let panic_msg = panic_message(&*panic_info);
                log::error!("[DISPATCH] PANIC during callback '{}': {}", data, panic_msg);
                format!("Internal error (panic): {}", panic_msg)
            }
        };

        if let Err(e) = transport.send(messages::system_error(&error)).await {
            log::error!("[DISPATCH] Failed to report error to operator: {}", e);
        }
    }

    /// Handle an inline button press. `origin` is the message carrying the
    /// button, edited in place where the flow calls for it.
    pub async fn handle_callback(
        &self,
        data: &str,
        origin: Option<SentMessage>,
        transport: &dyn ChatTransport,
    ) -> Result<(), String> {
        let mut session = self.session.lock().await;

        match data {
            messages::CONFIRM_TX | messages::CANCEL_TX if session.is_superseded(origin) => {
                transport.acknowledge(Some(SUPERSEDED_NOTICE.to_string())).await?;
            }
            messages::CONFIRM_TX => {
                // cleared before anything is executed
                let pending = session.take_pending();
                self.publish(&session);
                let pending = match pending {
                    Some(pending) => pending,
                    None => {
                        transport.acknowledge(Some("Transaction expired".to_string())).await?;
                        return Ok(());
                    }
                };
                transport.acknowledge(None).await?;
                show(transport, origin, messages::initiating()).await?;

                let outcome = match self.wallets.resolve(&pending.from_wallet) {
                    Ok(secret) => self
                        .executor
                        .transfer(secret, &pending.to, pending.amount)
                        .await
                        .map_err(|e| e.to_string()),
                    Err(e) => Err(e.to_string()),
                };

                let reply = match outcome {
                    Ok(receipt) => {
                        log::info!("[DISPATCH] Transfer confirmed: {}", receipt.tx_hash);
                        messages::receipt(
                            pending.amount,
                            self.executor.token_symbol(),
                            &pending.from_wallet,
                            &pending.display_name,
                            &receipt.explorer_url,
                        )
                    }
                    Err(reason) => {
                        log::warn!("[DISPATCH] Transfer failed: {}", reason);
                        messages::transfer_failed(&reason)
                    }
                };
                show(transport, origin, reply).await?;
            }
            messages::CANCEL_TX => {
                let cancelled = session.take_pending();
                self.publish(&session);
                if cancelled.is_none() {
                    transport.acknowledge(Some("No pending transaction".to_string())).await?;
                    return Ok(());
                }
                transport.acknowledge(Some("Transaction cancelled".to_string())).await?;
                show(transport, origin, messages::cancelled()).await?;
            }
            messages::HELP_ADD_CONTACT => {
                transport.acknowledge(None).await?;
                transport.send(messages::help_add_contact()).await?;
            }
            messages::HELP_DELETE_CONTACT => {
                transport.acknowledge(None).await?;
                transport.send(messages::help_delete_contact()).await?;
            }
            messages::REFRESH_BALANCE => {
                transport.acknowledge(Some("Refreshing...".to_string())).await?;
                transport.send(messages::refresh_balance_hint()).await?;
            }
            other => match other.strip_prefix(messages::SEND_FROM_PREFIX) {
                Some(wallet_name) if !wallet_name.is_empty() => {
                    transport.acknowledge(None).await?;
                    transport.send(messages::send_from_hint(wallet_name)).await?;
                }
                _ => {
                    log::warn!("[DISPATCH] Unknown callback data '{}'", other);
                    transport.acknowledge(None).await?;
                }
            },
        }

        Ok(())
    }
}

const SUPERSEDED_NOTICE: &str = "This request was replaced by a newer one";

/// Edit the originating message, or send a new one when there is none or the
/// edit is rejected
async fn show(transport: &dyn ChatTransport, origin: Option<SentMessage>, reply: Reply) -> Result<(), String> {
    if let Some(message) = origin {
        match transport.edit(message, reply.clone()).await {
            Ok(()) => return Ok(()),
            Err(e) => log::warn!("[DISPATCH] Edit failed, sending a new message: {}", e),
        }
    }
    transport.send(reply).await.map(|_| ())
}

fn panic_message(panic_info: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
}

/// Split "/name@bot arg1 arg2" into its parts
pub fn parse_command(text: &str) -> Option<Command> {
    let mut parts = text.split_whitespace();
    let head = parts.next()?.strip_prefix('/')?;
    let name = head.split('@').next().unwrap_or(head).to_lowercase();
    if name.is_empty() {
        return None;
    }
    Some(Command {
        name,
        args: parts.map(String::from).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(
            parse_command("/add_contact@authora_bot Farzi 0xabc"),
            Some(Command {
                name: "add_contact".to_string(),
                args: vec!["Farzi".to_string(), "0xabc".to_string()],
            })
        );
        assert_eq!(parse_command("/balance").map(|c| c.args.len()), Some(0));
        assert_eq!(parse_command("send 5 to bob"), None);
        assert_eq!(parse_command("/"), None);
    }
}
