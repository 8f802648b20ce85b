/// Entitlement gate tests with stubbed payment verifier and session ledger.
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use title_lookup_api::errors::AppError;
use title_lookup_api::models::SearchMode;
use title_lookup_api::payments::{
    CheckoutSession, Entitlement, EntitlementGate, PaymentVerifier, SessionLedger, VerifiedSession,
};

struct StubVerifier {
    session: VerifiedSession,
}

#[async_trait]
impl PaymentVerifier for StubVerifier {
    async fn create_session(
        &self,
        _mode: SearchMode,
        _search_value: &str,
        _base_url: &str,
    ) -> Result<CheckoutSession, AppError> {
        Ok(CheckoutSession {
            id: "cs_stub".to_string(),
            url: "https://checkout.example/cs_stub".to_string(),
        })
    }

    async fn retrieve_session(&self, _session_id: &str) -> Result<VerifiedSession, AppError> {
        Ok(self.session.clone())
    }
}

struct StubLedger {
    used: bool,
    consume_succeeds: bool,
    consume_calls: AtomicUsize,
}

impl StubLedger {
    fn fresh() -> Self {
        Self {
            used: false,
            consume_succeeds: true,
            consume_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SessionLedger for StubLedger {
    async fn is_used(&self, _session_id: &str) -> Result<bool, AppError> {
        Ok(self.used)
    }

    async fn consume(
        &self,
        _session_id: &str,
        _mode: SearchMode,
        _search_value: &str,
    ) -> Result<bool, AppError> {
        self.consume_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.consume_succeeds)
    }

    async fn record_pending(
        &self,
        _session_id: &str,
        _mode: SearchMode,
        _search_value: &str,
    ) -> Result<(), AppError> {
        Ok(())
    }
}

fn paid_session(search_type: &str, search_value: &str) -> VerifiedSession {
    VerifiedSession {
        paid: true,
        search_type: search_type.to_string(),
        search_value: search_value.to_string(),
    }
}

fn gate(session: VerifiedSession, ledger: Arc<StubLedger>) -> EntitlementGate {
    EntitlementGate::Gated {
        ledger,
        verifier: Arc::new(StubVerifier { session }),
    }
}

fn refusal(decision: Entitlement) -> String {
    match decision {
        Entitlement::Refused(reason) => reason,
        Entitlement::Granted => panic!("expected a refusal"),
    }
}

#[tokio::test]
async fn missing_session_id_is_refused() {
    let g = gate(paid_session("number", "OC123456"), Arc::new(StubLedger::fresh()));

    let none = g.authorize(SearchMode::Number, "OC123456", None).await.unwrap();
    assert!(refusal(none).contains("Payment required"));

    let blank = g
        .authorize(SearchMode::Number, "OC123456", Some("   "))
        .await
        .unwrap();
    assert!(refusal(blank).contains("Payment required"));
}

#[tokio::test]
async fn spent_session_is_refused_before_verification() {
    let ledger = Arc::new(StubLedger {
        used: true,
        ..StubLedger::fresh()
    });
    let g = gate(paid_session("number", "OC123456"), ledger.clone());

    let decision = g
        .authorize(SearchMode::Number, "OC123456", Some("cs_1"))
        .await
        .unwrap();
    assert!(refusal(decision).contains("already been used"));
    assert_eq!(ledger.consume_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unpaid_session_is_refused() {
    let mut session = paid_session("number", "OC123456");
    session.paid = false;
    let g = gate(session, Arc::new(StubLedger::fresh()));

    let decision = g
        .authorize(SearchMode::Number, "OC123456", Some("cs_1"))
        .await
        .unwrap();
    assert!(refusal(decision).contains("not completed"));
}

#[tokio::test]
async fn session_for_another_mode_is_refused() {
    let g = gate(paid_session("name", "ACME"), Arc::new(StubLedger::fresh()));

    let decision = g
        .authorize(SearchMode::Director, "ACME", Some("cs_1"))
        .await
        .unwrap();
    assert!(refusal(decision).contains("different search type"));
}

#[tokio::test]
async fn session_for_another_query_is_refused() {
    let g = gate(paid_session("name", "ACME LIMITED"), Arc::new(StubLedger::fresh()));

    let decision = g
        .authorize(SearchMode::Name, "SOMEONE ELSE", Some("cs_1"))
        .await
        .unwrap();
    assert!(refusal(decision).contains("different search query"));
}

#[tokio::test]
async fn query_match_is_case_and_whitespace_insensitive() {
    let ledger = Arc::new(StubLedger::fresh());
    let g = gate(paid_session("name", "ACME LIMITED"), ledger.clone());

    let decision = g
        .authorize(SearchMode::Name, "  acme limited ", Some("cs_1"))
        .await
        .unwrap();
    assert!(matches!(decision, Entitlement::Granted));
    assert_eq!(ledger.consume_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn losing_the_consume_race_is_refused() {
    let ledger = Arc::new(StubLedger {
        consume_succeeds: false,
        ..StubLedger::fresh()
    });
    let g = gate(paid_session("number", "OC123456"), ledger.clone());

    let decision = g
        .authorize(SearchMode::Number, "OC123456", Some("cs_1"))
        .await
        .unwrap();
    assert!(refusal(decision).contains("already been used"));
    assert_eq!(ledger.consume_calls.load(Ordering::SeqCst), 1);
}
