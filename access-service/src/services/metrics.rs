//! Access decision metrics, exported through the service-core Prometheus recorder.

use metrics::counter;

pub fn record_decision(granted: bool) {
    let outcome = if granted { "granted" } else { "denied" };
    counter!("access_decisions_total", "outcome" => outcome).increment(1);
}

pub fn record_denial_reason(kind: &'static str) {
    counter!("access_denial_reasons_total", "reason" => kind).increment(1);
}

pub fn record_otp_issued() {
    counter!("otp_issued_total").increment(1);
}

pub fn record_audit_failure() {
    counter!("audit_write_failures_total").increment(1);
}

pub fn record_alert(source: &'static str) {
    counter!("alerts_dispatched_total", "source" => source).increment(1);
}

pub fn record_alert_abandoned() {
    counter!("alerts_abandoned_total").increment(1);
}
