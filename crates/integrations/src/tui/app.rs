use std::time::Instant;

use integrations_core::backend::BackendResult;
use integrations_core::services::credentials::{
    launch_browser, parse_credentials, CredentialError, CredentialService,
};
use integrations_core::services::loader::DataLoader;
use integrations_core::view::{render_cards, ItemCard};
use integrations_core::{Identity, IntegrationParams, IntegrationType, Item};
use serde_json::Value;
use tokio::task::JoinHandle;
use url::Url;

const SPINNER_FRAMES: [char; 4] = ['-', '\\', '|', '/'];
const IDLE_STATUS: &str = "Tab to move between fields, F1 for help, Esc to quit";

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Focus {
    User,
    Org,
    Integration,
    Credentials,
}

impl Focus {
    const ORDER: [Focus; 4] = [Focus::User, Focus::Org, Focus::Integration, Focus::Credentials];

    fn step(self, delta: isize) -> Focus {
        let idx = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0) as isize;
        let len = Self::ORDER.len() as isize;
        Self::ORDER[(idx + delta).rem_euclid(len) as usize]
    }
}

/// Authorization flow waiting for the user to finish in the browser.
pub struct AwaitingAuthorization {
    pub kind: IntegrationType,
    pub url: Url,
    identity: Identity,
}

pub struct App {
    loader: DataLoader,
    credential_service: CredentialService,
    identity: Identity,
    selected: Option<IntegrationType>,
    credential_input: String,
    params: IntegrationParams,
    cards: Vec<ItemCard>,
    focus: Focus,
    pending_loads: Vec<JoinHandle<(Instant, BackendResult<Vec<Item>>)>>,
    pending_authorize: Option<(IntegrationType, Identity, JoinHandle<Result<Url, CredentialError>>)>,
    awaiting: Option<AwaitingAuthorization>,
    pending_credentials: Option<(IntegrationType, JoinHandle<Result<Value, CredentialError>>)>,
    alert: Option<String>,
    show_help: bool,
    status_base: String,
    status_spinner: bool,
    spinner_index: usize,
    scroll: u16,
    open_browser: bool,
}

impl App {
    pub(crate) fn new(
        loader: DataLoader,
        credential_service: CredentialService,
        identity: Identity,
    ) -> Self {
        Self {
            loader,
            credential_service,
            identity,
            selected: None,
            credential_input: String::new(),
            params: IntegrationParams::default(),
            cards: Vec::new(),
            focus: Focus::User,
            pending_loads: Vec::new(),
            pending_authorize: None,
            awaiting: None,
            pending_credentials: None,
            alert: None,
            show_help: false,
            status_base: IDLE_STATUS.into(),
            status_spinner: false,
            spinner_index: 0,
            scroll: 0,
            open_browser: true,
        }
    }

    #[cfg(test)]
    fn without_browser(mut self) -> Self {
        self.open_browser = false;
        self
    }

    pub(crate) fn identity(&self) -> &Identity {
        &self.identity
    }

    pub(crate) fn selected(&self) -> Option<IntegrationType> {
        self.selected
    }

    pub(crate) fn credential_input(&self) -> &str {
        &self.credential_input
    }

    pub(crate) fn params(&self) -> &IntegrationParams {
        &self.params
    }

    pub(crate) fn cards(&self) -> &[ItemCard] {
        &self.cards
    }

    pub(crate) fn focus(&self) -> Focus {
        self.focus
    }

    pub(crate) fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    pub(crate) fn awaiting(&self) -> Option<&AwaitingAuthorization> {
        self.awaiting.as_ref()
    }

    pub(crate) fn show_help(&self) -> bool {
        self.show_help
    }

    pub(crate) fn scroll(&self) -> u16 {
        self.scroll
    }

    pub(crate) fn set_status(&mut self, message: impl Into<String>, spinner: bool) {
        self.status_base = message.into();
        self.status_spinner = spinner;
        if spinner {
            self.spinner_index = 0;
        }
    }

    pub(crate) fn status_text(&self) -> String {
        if self.status_spinner {
            let frame = SPINNER_FRAMES[self.spinner_index % SPINNER_FRAMES.len()];
            format!("{} {}", self.status_base, frame)
        } else {
            self.status_base.clone()
        }
    }

    pub(crate) fn tick(&mut self) {
        if self.status_spinner {
            self.spinner_index = self.spinner_index.wrapping_add(1);
        }
    }

    pub(crate) fn has_pending(&self) -> bool {
        !self.pending_loads.is_empty()
            || self.pending_authorize.is_some()
            || self.pending_credentials.is_some()
    }

    pub(crate) fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub(crate) fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    fn raise_alert(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(%message, "action failed");
        self.alert = Some(message);
    }

    pub(crate) fn cycle_focus(&mut self, delta: isize) {
        self.focus = self.focus.step(delta);
    }

    pub(crate) fn cycle_integration(&mut self, delta: isize) {
        self.selected = Some(IntegrationType::cycle(self.selected, delta));
    }

    pub(crate) fn push_char(&mut self, ch: char) {
        match self.focus {
            Focus::User => self.identity.user.push(ch),
            Focus::Org => self.identity.org.push(ch),
            Focus::Credentials => self.credential_input.push(ch),
            Focus::Integration => {}
        }
    }

    pub(crate) fn pop_char(&mut self) {
        match self.focus {
            Focus::User => {
                self.identity.user.pop();
            }
            Focus::Org => {
                self.identity.org.pop();
            }
            Focus::Credentials => {
                self.credential_input.pop();
            }
            Focus::Integration => {}
        }
    }

    pub(crate) fn scroll_items(&mut self, delta: i32) {
        let next = (self.scroll as i32 + delta).max(0);
        self.scroll = next.min(u16::MAX as i32) as u16;
    }

    /// Publish manually entered credentials for the selected integration.
    pub(crate) fn submit_credentials(&mut self) {
        let Some(kind) = self.selected else {
            self.set_status("Select an integration type first", false);
            return;
        };
        match parse_credentials(&self.credential_input) {
            Ok(credentials) => {
                self.params.set_credentials(kind, credentials);
                self.credential_input.clear();
                self.set_status(format!("{kind} credentials set; Ctrl+L to load"), false);
            }
            Err(err) => self.raise_alert(err.user_message()),
        }
    }

    /// Start the backend authorization flow for the selected integration.
    pub(crate) fn start_connect(&mut self) {
        let Some(kind) = self.selected else {
            self.set_status("Select an integration type first", false);
            return;
        };
        if self.pending_authorize.is_some() || self.pending_credentials.is_some() {
            return;
        }
        let service = self.credential_service.clone();
        let identity = self.identity.clone();
        let request_identity = identity.clone();
        let handle =
            tokio::spawn(async move { service.authorization_url(kind, &request_identity).await });
        self.pending_authorize = Some((kind, identity, handle));
        self.set_status(format!("Requesting {kind} authorization"), true);
    }

    /// The user finished in the browser; fetch what the backend stored.
    pub(crate) fn finish_connect(&mut self) {
        let Some(awaiting) = self.awaiting.take() else {
            return;
        };
        let service = self.credential_service.clone();
        let kind = awaiting.kind;
        let identity = awaiting.identity;
        let handle = tokio::spawn(async move { service.fetch(kind, &identity).await });
        self.pending_credentials = Some((kind, handle));
        self.set_status(format!("Fetching {kind} credentials"), true);
    }

    pub(crate) fn cancel_connect(&mut self) {
        if self.awaiting.take().is_some() {
            self.set_status("Authorization cancelled", false);
        }
    }

    pub(crate) fn load_available(&self) -> bool {
        self.params.has_credentials()
    }

    /// Fire a load for the current pair. Overlapping loads are allowed; the last
    /// response to arrive wins.
    pub(crate) fn start_load(&mut self) {
        let target = self
            .params
            .load_target()
            .map(|(kind, credentials)| (kind, credentials.clone()));
        let (kind, credentials) = match target {
            Ok(pair) => pair,
            Err(_) => {
                self.set_status("Connect credentials before loading", false);
                return;
            }
        };
        let loader = self.loader.clone();
        self.pending_loads
            .push(tokio::spawn(async move {
                let result = loader.fetch(kind, credentials).await;
                (Instant::now(), result)
            }));
        self.set_status(format!("Loading {kind} items"), true);
    }

    pub(crate) fn clear_items(&mut self) {
        self.loader.clear(&mut self.params);
        self.refresh_cards();
        self.set_status("Items cleared", false);
    }

    fn refresh_cards(&mut self) {
        self.cards = render_cards(&self.params.items);
        self.scroll = 0;
    }

    /// Apply finished background work to the shared state.
    pub(crate) async fn process_pending(&mut self) {
        let mut finished = Vec::new();
        let mut idx = 0;
        while idx < self.pending_loads.len() {
            if self.pending_loads[idx].is_finished() {
                finished.push(self.pending_loads.remove(idx));
            } else {
                idx += 1;
            }
        }

        let mut arrived = Vec::with_capacity(finished.len());
        for handle in finished {
            match handle.await {
                Ok(pair) => arrived.push(pair),
                Err(err) => self.raise_alert(format!("load task failed: {err}")),
            }
        }
        // Apply in response order so the last response to arrive wins.
        arrived.sort_by_key(|(at, _)| *at);
        for (_, result) in arrived {
            match self.params.apply_load(result) {
                Ok(count) => {
                    self.refresh_cards();
                    self.set_status(format!("Loaded {count} items"), false);
                }
                Err(err) => {
                    self.set_status("Load failed", false);
                    self.raise_alert(err.user_message());
                }
            }
        }

        if self
            .pending_authorize
            .as_ref()
            .is_some_and(|(_, _, handle)| handle.is_finished())
        {
            if let Some((kind, identity, handle)) = self.pending_authorize.take() {
                match handle.await {
                    Ok(Ok(url)) => self.begin_waiting(kind, identity, url),
                    Ok(Err(err)) => {
                        self.set_status("Authorization failed", false);
                        self.raise_alert(err.user_message());
                    }
                    Err(err) => self.raise_alert(format!("authorization task failed: {err}")),
                }
            }
        }

        if self
            .pending_credentials
            .as_ref()
            .is_some_and(|(_, handle)| handle.is_finished())
        {
            if let Some((kind, handle)) = self.pending_credentials.take() {
                match handle.await {
                    Ok(Ok(credentials)) => {
                        self.params.set_credentials(kind, credentials);
                        self.set_status(format!("{kind} connected; Ctrl+L to load"), false);
                    }
                    Ok(Err(err)) => {
                        self.set_status("Connecting failed", false);
                        self.raise_alert(err.user_message());
                    }
                    Err(err) => self.raise_alert(format!("credentials task failed: {err}")),
                }
            }
        }

        if !self.has_pending() && self.status_spinner {
            self.status_spinner = false;
        }
    }

    fn begin_waiting(&mut self, kind: IntegrationType, identity: Identity, url: Url) {
        if self.open_browser {
            if let Err(err) = launch_browser(&url) {
                tracing::warn!(error = %err, "browser launch failed");
            }
        }
        self.set_status(
            format!("Finish {kind} authorization in the browser, then press Enter"),
            false,
        );
        self.awaiting = Some(AwaitingAuthorization {
            kind,
            url,
            identity,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use integrations_core::backend::BackendClient;
    use serde_json::json;
    use std::time::Duration;

    fn app_for(server: &MockServer) -> App {
        let client = BackendClient::with_base_url(&server.base_url()).unwrap();
        App::new(
            DataLoader::new(client.clone()),
            CredentialService::new(client),
            Identity::default(),
        )
        .without_browser()
    }

    async fn settle(app: &mut App) {
        for _ in 0..200 {
            app.process_pending().await;
            if !app.has_pending() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("background work did not finish");
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            app.push_char(ch);
        }
    }

    #[tokio::test]
    async fn load_requires_credentials() {
        let server = MockServer::start();
        let mut app = app_for(&server);
        assert!(!app.load_available());
        app.start_load();
        assert!(!app.has_pending());
        assert!(app.status_text().contains("Connect credentials"));
    }

    #[tokio::test]
    async fn manual_credentials_then_load_renders_cards() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/integrations/airtable/load")
                .body_contains("pat123");
            then.status(200).json_body_obj(&json!([
                { "id": "tbl1", "name": "Contacts", "created_time": "N/A" },
                { "id": "tbl2", "name": "Deals" }
            ]));
        });

        let mut app = app_for(&server);
        app.cycle_integration(1);
        app.cycle_integration(1);
        assert_eq!(app.selected(), Some(IntegrationType::Airtable));

        app.focus = Focus::Credentials;
        type_text(&mut app, r#"{"access_token":"pat123"}"#);
        app.submit_credentials();
        assert!(app.load_available());
        assert!(app.credential_input().is_empty());

        app.start_load();
        settle(&mut app).await;

        assert_eq!(app.cards().len(), 2);
        assert_eq!(app.cards()[0].title.as_deref(), Some("Contacts"));
        assert_eq!(app.cards()[0].fields.len(), 1);
        assert!(app.alert().is_none());

        app.clear_items();
        assert!(app.params().items.is_empty());
        assert!(app.cards().is_empty());
    }

    #[tokio::test]
    async fn failed_load_alerts_and_keeps_items() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/integrations/notion/load");
            then.status(400).json_body_obj(&json!({ "detail": "Token expired" }));
        });

        let mut app = app_for(&server);
        app.params
            .set_credentials(IntegrationType::Notion, json!({ "access_token": "t" }));
        app.params.items = vec![json!({ "id": "kept" }).as_object().cloned().unwrap()];

        app.start_load();
        settle(&mut app).await;

        assert_eq!(app.alert(), Some("Token expired"));
        assert_eq!(app.params().items.len(), 1);
        app.dismiss_alert();
        assert!(app.alert().is_none());
    }

    #[tokio::test]
    async fn last_response_wins() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/integrations/hubspot/load")
                .body_contains("slow");
            then.status(200)
                .delay(Duration::from_millis(300))
                .json_body_obj(&json!([{ "id": "from-slow" }]));
        });
        server.mock(|when, then| {
            when.method(POST)
                .path("/integrations/hubspot/load")
                .body_contains("fast");
            then.status(200).json_body_obj(&json!([{ "id": "from-fast" }]));
        });

        let mut app = app_for(&server);
        app.params
            .set_credentials(IntegrationType::Hubspot, json!({ "access_token": "slow" }));
        app.start_load();
        app.params
            .set_credentials(IntegrationType::Hubspot, json!({ "access_token": "fast" }));
        app.start_load();
        settle(&mut app).await;

        assert_eq!(app.params().items.len(), 1);
        assert_eq!(app.params().items[0]["id"], "from-slow");
    }

    #[tokio::test]
    async fn responses_finishing_in_one_tick_apply_in_arrival_order() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/integrations/notion/load")
                .body_contains("started-first");
            then.status(200)
                .delay(Duration::from_millis(120))
                .json_body_obj(&json!([{ "id": "started-first-arrived-last" }]));
        });
        server.mock(|when, then| {
            when.method(POST)
                .path("/integrations/notion/load")
                .body_contains("started-second");
            then.status(200)
                .json_body_obj(&json!([{ "id": "started-second-arrived-first" }]));
        });

        let mut app = app_for(&server);
        app.params
            .set_credentials(IntegrationType::Notion, json!({ "access_token": "started-first" }));
        app.start_load();
        app.params
            .set_credentials(IntegrationType::Notion, json!({ "access_token": "started-second" }));
        app.start_load();

        tokio::time::sleep(Duration::from_millis(190)).await;
        for _ in 0..50 {
            if app.pending_loads.iter().all(|handle| handle.is_finished()) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        app.process_pending().await;

        assert!(!app.has_pending());
        assert_eq!(app.params().items[0]["id"], "started-first-arrived-last");
    }

    #[tokio::test]
    async fn invalid_manual_credentials_raise_alert() {
        let server = MockServer::start();
        let mut app = app_for(&server);
        app.cycle_integration(1);
        app.focus = Focus::Credentials;
        type_text(&mut app, "not json");
        app.submit_credentials();
        assert!(app.alert().is_some());
        assert!(!app.load_available());
    }

    #[tokio::test]
    async fn oauth_flow_publishes_credentials() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/integrations/notion/authorize");
            then.status(200)
                .json_body_obj(&json!("https://api.notion.com/v1/oauth/authorize"));
        });
        server.mock(|when, then| {
            when.method(POST)
                .path("/integrations/notion/credentials")
                .body_contains("ada");
            then.status(200).json_body_obj(&json!({ "access_token": "n-tok" }));
        });

        let mut app = app_for(&server);
        app.focus = Focus::User;
        app.identity.user.clear();
        type_text(&mut app, "ada");
        app.cycle_integration(1);

        app.start_connect();
        settle(&mut app).await;
        let awaiting = app.awaiting().expect("waiting for browser");
        assert_eq!(awaiting.kind, IntegrationType::Notion);

        app.finish_connect();
        settle(&mut app).await;

        assert_eq!(app.params().integration_type, Some(IntegrationType::Notion));
        assert_eq!(
            app.params().credentials.as_ref().unwrap()["access_token"],
            "n-tok"
        );
    }

    #[test]
    fn focus_wraps() {
        assert_eq!(Focus::User.step(-1), Focus::Credentials);
        assert_eq!(Focus::Credentials.step(1), Focus::User);
    }
}
