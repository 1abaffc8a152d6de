//! Authentication and the signed-in account

use std::sync::Arc;

use fluxsync::{Action, ChangeError, ChangeEvent, ErrorKind, LocalId, Reaction, Slice};
use tracing::debug;

use crate::client::{AccountClient, NetworkResult};
use crate::model::{Account, UsernameAction};

#[derive(Clone, PartialEq)]
pub struct AuthenticatePayload {
    pub username: String,
    pub password: String,
}

impl AuthenticatePayload {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

// Keep passwords out of action logs
impl std::fmt::Debug for AuthenticatePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatePayload")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, PartialEq)]
pub struct AuthenticatedPayload {
    pub username: String,
    /// The access token on success
    pub result: NetworkResult<String>,
}

impl std::fmt::Debug for AuthenticatedPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let result = self.result.as_ref().map(|_| "<token>");
        f.debug_struct("AuthenticatedPayload")
            .field("username", &self.username)
            .field("result", &result)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PushUsernamePayload {
    pub username: String,
    pub action: UsernameAction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PushedUsernamePayload {
    pub username: String,
    pub action: UsernameAction,
    pub result: NetworkResult<()>,
}

#[derive(Action, Clone, Debug, PartialEq)]
pub enum AccountAction {
    Authenticate(AuthenticatePayload),
    FetchAccount,
    PushUsername(PushUsernamePayload),

    Authenticated(AuthenticatedPayload),
    FetchedAccount(NetworkResult<Account>),
    PushedUsername(PushedUsernamePayload),

    SignOut,
    UpdateAccessToken(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AccountChange {
    /// The access token was set or cleared
    Authentication { signed_in: bool },
    /// The stored account was replaced or cleared
    Account,
    Username { username: String, action: UsernameAction },
}

type AccountReaction = Reaction<AccountAction, AccountChange>;

const ACCOUNT_ID: LocalId = LocalId(1);

pub struct AccountSession {
    token: Option<String>,
    account: Option<Account>,
    client: Arc<dyn AccountClient>,
}

impl AccountSession {
    pub fn new(client: Arc<dyn AccountClient>) -> Self {
        Self {
            token: None,
            account: None,
            client,
        }
    }

    pub fn has_access_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    fn signed_out(cause: AccountActionType) -> AccountReaction {
        Reaction::unchanged().emit(ChangeEvent::failed(
            cause,
            ChangeError::new(ErrorKind::Auth, "not_authenticated", "No access token"),
        ))
    }

    fn empty_username(cause: AccountActionType) -> AccountReaction {
        Reaction::unchanged().emit(ChangeEvent::failed(
            cause,
            ChangeError::validation("empty_username", "Username must not be empty"),
        ))
    }

    fn authenticate(&self, payload: AuthenticatePayload) -> AccountReaction {
        if payload.username.trim().is_empty() {
            return Self::empty_username(AccountActionType::Authenticate);
        }
        let client = self.client.clone();
        debug!(store = Self::NAME, action = "Authenticate", username = %payload.username, "authenticating");
        Reaction::unchanged().request(async move {
            let result = client
                .authenticate(&payload.username, &payload.password)
                .await;
            AccountAction::Authenticated(AuthenticatedPayload {
                username: payload.username,
                result,
            })
        })
    }

    fn fetch_account(&self) -> AccountReaction {
        let Some(token) = self.token.clone() else {
            return Self::signed_out(AccountActionType::FetchAccount);
        };
        let client = self.client.clone();
        Reaction::unchanged().request(async move {
            AccountAction::FetchedAccount(client.fetch_account(&token).await)
        })
    }

    fn push_username(&self, payload: PushUsernamePayload) -> AccountReaction {
        if payload.username.trim().is_empty() {
            return Self::empty_username(AccountActionType::PushUsername);
        }
        let Some(token) = self.token.clone() else {
            return Self::signed_out(AccountActionType::PushUsername);
        };
        let client = self.client.clone();
        debug!(store = Self::NAME, action = "PushUsername", username = %payload.username, action_kind = ?payload.action, "changing username");
        Reaction::unchanged().request(async move {
            let result = client
                .push_username(&token, &payload.username, payload.action)
                .await;
            AccountAction::PushedUsername(PushedUsernamePayload {
                username: payload.username,
                action: payload.action,
                result,
            })
        })
    }

    fn set_token(&mut self, token: Option<String>, cause: AccountActionType) -> AccountReaction {
        self.token = token.filter(|t| !t.is_empty());
        Reaction::changed().emit(ChangeEvent::ok(
            cause,
            AccountChange::Authentication {
                signed_in: self.token.is_some(),
            },
        ))
    }
}

impl Slice for AccountSession {
    type Action = AccountAction;
    type Change = AccountChange;
    const NAME: &'static str = "account";
    const DOMAIN: &'static str = AccountActionType::DOMAIN;

    fn reduce(&mut self, action: AccountAction) -> AccountReaction {
        match action {
            AccountAction::Authenticate(payload) => self.authenticate(payload),
            AccountAction::FetchAccount => self.fetch_account(),
            AccountAction::PushUsername(payload) => self.push_username(payload),

            AccountAction::Authenticated(payload) => match payload.result {
                Ok(token) => {
                    debug!(store = Self::NAME, action = "Authenticated", username = %payload.username, "signed in");
                    self.set_token(Some(token), AccountActionType::Authenticated)
                }
                Err(error) => Reaction::unchanged()
                    .emit(ChangeEvent::failed(AccountActionType::Authenticated, error)),
            },
            AccountAction::FetchedAccount(result) => match result {
                Ok(mut account) => {
                    account.local_id = ACCOUNT_ID;
                    self.account = Some(account);
                    Reaction::changed()
                        .emit(ChangeEvent::ok(AccountActionType::FetchedAccount, AccountChange::Account))
                }
                Err(error) => Reaction::unchanged()
                    .emit(ChangeEvent::failed(AccountActionType::FetchedAccount, error)),
            },
            AccountAction::PushedUsername(payload) => match payload.result {
                Ok(()) => {
                    if let Some(account) = self.account.as_mut() {
                        account.username = payload.username.clone();
                    }
                    Reaction::changed().emit(ChangeEvent::ok(
                        AccountActionType::PushedUsername,
                        AccountChange::Username {
                            username: payload.username,
                            action: payload.action,
                        },
                    ))
                }
                Err(error) => Reaction::unchanged()
                    .emit(ChangeEvent::failed(AccountActionType::PushedUsername, error)),
            },

            AccountAction::SignOut => {
                self.account = None;
                debug!(store = Self::NAME, action = "SignOut", "signed out");
                self.set_token(None, AccountActionType::SignOut)
                    .emit(ChangeEvent::ok(AccountActionType::SignOut, AccountChange::Account))
            }
            AccountAction::UpdateAccessToken(token) => {
                self.set_token(Some(token), AccountActionType::UpdateAccessToken)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockServer;
    use crate::test_util::settle;
    use fluxsync::{ActionKind, ActionType, RemoteId};

    fn signed_up_server() -> Arc<MockServer> {
        let server = MockServer::new();
        server.add_user(
            "ada",
            "hunter2",
            Account {
                user_id: Some(RemoteId(7)),
                username: "ada".into(),
                display_name: "Ada".into(),
                ..Default::default()
            },
        );
        server
    }

    #[test]
    fn test_kinds() {
        assert_eq!(AccountActionType::SignOut.kind(), ActionKind::Local);
        assert_eq!(AccountActionType::UpdateAccessToken.kind(), ActionKind::Local);
        assert_eq!(AccountActionType::Authenticated.kind(), ActionKind::Response);
        assert_eq!(AccountActionType::FetchAccount.kind(), ActionKind::Request);
    }

    #[test]
    fn test_password_not_in_debug_output() {
        let payload = AuthenticatePayload::new("ada", "hunter2");
        assert!(!format!("{:?}", payload).contains("hunter2"));
    }

    #[tokio::test]
    async fn test_sign_in_then_fetch_account() {
        let server = signed_up_server();
        let mut session = AccountSession::new(server.clone());

        let events = settle(
            &mut session,
            AccountAction::Authenticate(AuthenticatePayload::new("ada", "hunter2")),
        )
        .await;
        assert_eq!(
            events[0].data,
            Some(AccountChange::Authentication { signed_in: true })
        );
        assert_eq!(session.access_token(), Some("token-ada"));

        let events = settle(&mut session, AccountAction::FetchAccount).await;
        assert_eq!(events[0].data, Some(AccountChange::Account));
        assert_eq!(session.account().unwrap().display_name, "Ada");
    }

    #[tokio::test]
    async fn test_wrong_password_is_auth_error() {
        let server = signed_up_server();
        let mut session = AccountSession::new(server);

        let events = settle(
            &mut session,
            AccountAction::Authenticate(AuthenticatePayload::new("ada", "nope")),
        )
        .await;

        assert_eq!(events[0].error.as_ref().unwrap().kind, ErrorKind::Auth);
        assert!(!session.has_access_token());
    }

    #[tokio::test]
    async fn test_fetch_without_token_is_rejected_locally() {
        let server = signed_up_server();
        let mut session = AccountSession::new(server.clone());

        let events = settle(&mut session, AccountAction::FetchAccount).await;

        assert_eq!(events[0].error.as_ref().unwrap().kind, ErrorKind::Auth);
        assert_eq!(server.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_username_is_validation_error() {
        let server = signed_up_server();
        let mut session = AccountSession::new(server.clone());
        session.reduce(AccountAction::UpdateAccessToken("token-ada".into()));

        let events = settle(
            &mut session,
            AccountAction::PushUsername(PushUsernamePayload {
                username: "  ".into(),
                action: UsernameAction::default(),
            }),
        )
        .await;

        let error = events[0].error.as_ref().unwrap();
        assert_eq!(error.kind, ErrorKind::Validation);
        assert_eq!(error.code, "empty_username");
        assert_eq!(server.calls("push_username"), 0);
    }

    #[tokio::test]
    async fn test_push_username_updates_account() {
        let server = signed_up_server();
        let mut session = AccountSession::new(server);
        settle(
            &mut session,
            AccountAction::Authenticate(AuthenticatePayload::new("ada", "hunter2")),
        )
        .await;
        settle(&mut session, AccountAction::FetchAccount).await;

        let events = settle(
            &mut session,
            AccountAction::PushUsername(PushUsernamePayload {
                username: "lovelace".into(),
                action: UsernameAction::RenameSiteAndKeepOldAddress,
            }),
        )
        .await;

        assert!(matches!(
            &events[0].data,
            Some(AccountChange::Username { username, .. }) if username == "lovelace"
        ));
        assert_eq!(session.account().unwrap().username, "lovelace");
    }

    #[test]
    fn test_sign_out_emits_two_events() {
        let server = MockServer::new();
        let mut session = AccountSession::new(server);
        session.reduce(AccountAction::UpdateAccessToken("abc".into()));

        let reaction = session.reduce(AccountAction::SignOut);

        let data: Vec<_> = reaction.events.iter().map(|e| e.data.clone()).collect();
        assert_eq!(
            data,
            vec![
                Some(AccountChange::Authentication { signed_in: false }),
                Some(AccountChange::Account),
            ]
        );
        assert!(!session.has_access_token());
        assert!(session.account().is_none());
    }
}
