//! Maps where a browser ends up to an item lifecycle verdict.
//!
//! The storefront has no documented availability API: a live product lands on
//! a checkout page, a removed one bounces to the shop landing page or 404s, and
//! an expired session lands on a login page. The rules below encode that
//! contract in one place. When the storefront changes its URL shapes, this
//! module is the only thing that should need editing.

use crate::types::{ClassificationResult, Verdict};

// ---------------------------------------------------------------------------
// Landing (input)
// ---------------------------------------------------------------------------

/// The terminal state of a redirect walk.
#[derive(Debug, Clone, Copy)]
pub struct Landing<'a> {
    pub final_url: &'a str,
    pub final_status: u16,
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// A fn-pointer rule. First match wins.
pub struct Rule {
    pub id: &'static str,
    pub condition: fn(&Landing) -> bool,
    pub verdict: Verdict,
}

/// Default rule order. The login check must stay first so a login page that
/// also answers 404 is still reported as an expired session.
pub fn default_rules() -> Vec<Rule> {
    vec![
        Rule {
            id: "login-redirect",
            condition: |l| l.final_url.contains("login") || l.final_url.contains("account.battle.net"),
            verdict: Verdict::SessionInvalid,
        },
        Rule {
            id: "not-found",
            condition: |l| l.final_status == 404,
            verdict: Verdict::Inactive,
        },
        Rule {
            id: "checkout-page",
            condition: |l| l.final_url.contains("checkout"),
            verdict: Verdict::Active,
        },
        Rule {
            id: "shop-landing",
            condition: |l| l.final_url.contains("shop.battle.net"),
            verdict: Verdict::Inactive,
        },
    ]
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

pub struct Classifier {
    rules: Vec<Rule>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl Classifier {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn classify(&self, final_url: &str, final_status: u16) -> ClassificationResult {
        let landing = Landing {
            final_url,
            final_status,
        };
        let matched = self.rules.iter().find(|rule| (rule.condition)(&landing));

        ClassificationResult {
            final_url: final_url.to_string(),
            final_status,
            // Fallback: unrecognised landing, leave stored state alone
            verdict: matched.map_or(Verdict::Unknown, |rule| rule.verdict),
            rule: matched.map(|rule| rule.id),
        }
    }
}

/// Classify with the default rule set.
pub fn classify(final_url: &str, final_status: u16) -> Verdict {
    Classifier::default()
        .classify(final_url, final_status)
        .verdict
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkout_page_is_active() {
        assert_eq!(
            classify("https://eu.battle.net/shop/en/checkout/ABC123", 200),
            Verdict::Active
        );
    }

    #[test]
    fn shop_landing_is_inactive() {
        assert_eq!(classify("https://shop.battle.net/", 302), Verdict::Inactive);
        assert_eq!(classify("https://shop.battle.net/en-us", 200), Verdict::Inactive);
    }

    #[test]
    fn not_found_is_inactive_even_on_checkout_url() {
        assert_eq!(
            classify("https://eu.battle.net/shop/en/checkout/buy/GONE", 404),
            Verdict::Inactive
        );
    }

    #[test]
    fn login_takes_precedence_over_not_found() {
        assert_eq!(
            classify("https://eu.battle.net/login/en/", 404),
            Verdict::SessionInvalid
        );
    }

    #[test]
    fn account_host_is_session_invalid() {
        assert_eq!(
            classify("https://account.battle.net/overview", 200),
            Verdict::SessionInvalid
        );
    }

    #[test]
    fn login_beats_checkout() {
        // Login pages often carry the original checkout URL as a return parameter.
        assert_eq!(
            classify(
                "https://eu.battle.net/login/en/?ref=https://eu.battle.net/shop/en/checkout/buy/X",
                200
            ),
            Verdict::SessionInvalid
        );
    }

    #[test]
    fn unrecognised_landing_is_unknown() {
        assert_eq!(classify("https://example.com/elsewhere", 200), Verdict::Unknown);
        assert_eq!(classify("https://example.com/elsewhere", 0), Verdict::Unknown);
        assert_eq!(classify("", 500), Verdict::Unknown);
    }

    #[test]
    fn result_reports_matching_rule_id() {
        let result = Classifier::default().classify("https://shop.battle.net/", 200);
        assert_eq!(result.rule, Some("shop-landing"));
        assert_eq!(result.final_status, 200);

        let fallback = Classifier::default().classify("https://example.com/", 200);
        assert_eq!(fallback.rule, None);
        assert_eq!(fallback.verdict, Verdict::Unknown);
    }

    #[test]
    fn custom_rules_replace_defaults() {
        let classifier = Classifier::new(vec![Rule {
            id: "teapot",
            condition: |l| l.final_status == 418,
            verdict: Verdict::Active,
        }]);
        assert_eq!(
            classifier.classify("https://anything/", 418).verdict,
            Verdict::Active
        );
        // Default checkout rule is gone.
        assert_eq!(
            classifier.classify("https://x/checkout", 200).verdict,
            Verdict::Unknown
        );
    }

    #[test]
    fn every_status_yields_exactly_one_verdict() {
        let urls = [
            "https://eu.battle.net/login",
            "https://eu.battle.net/shop/en/checkout/buy/A",
            "https://shop.battle.net/",
            "https://example.com/",
        ];
        for url in urls {
            for status in [0u16, 200, 301, 302, 404, 500] {
                // Pure: same input, same answer.
                assert_eq!(classify(url, status), classify(url, status));
            }
        }
    }
}
