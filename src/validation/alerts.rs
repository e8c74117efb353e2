// src/validation/alerts.rs
use std::collections::BTreeMap;

use crate::domain::models::{Alert, Discrepancy, Domain, ValidationResult};

/// Warning for a discrepancy that crossed its threshold
pub fn discrepancy_alert(domain: Domain, discrepancy: &Discrepancy) -> Alert {
    let names = discrepancy.source_names();
    Alert::warning(
        domain,
        format!(
            "{} sources disagree on {}: {:.2}% spread exceeds {:.2}% threshold ({})",
            domain,
            discrepancy.metric,
            discrepancy.variance,
            discrepancy.threshold,
            names.join(", ")
        ),
        names,
        format!(
            "Treat {} {} with caution until sources converge",
            domain, discrepancy.metric
        ),
    )
}

/// Alerts for a finished run: validator alerts unchanged plus one warning per
/// exceeded discrepancy. Fatal alerts come first, then schedule order.
pub fn generate_alerts(results: &BTreeMap<Domain, ValidationResult>) -> Vec<Alert> {
    let mut alerts: Vec<Alert> = Vec::new();

    for (domain, result) in results {
        alerts.extend(result.alerts.iter().cloned());
        alerts.extend(
            result
                .discrepancies
                .iter()
                .filter(|d| d.exceeded)
                .map(|d| discrepancy_alert(*domain, d)),
        );
    }

    // stable sort keeps domain order within each severity
    alerts.sort_by_key(|a| !a.is_fatal());
    alerts
}
