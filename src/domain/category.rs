use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub display_name: String,
    pub description: String,

    pub is_active: bool,
    pub is_default: bool,

    /// Added to calculated priority. NOT applied automatically by the
    /// priority scorer -- callers that want it included must pass it as an
    /// explicit custom priority rule, keeping the scorer decoupled from the
    /// category repository.
    pub priority_boost: i32,

    pub sla_first_response_hours: f64,
    pub sla_resolution_hours: f64,

    pub keywords: Vec<String>,
    pub negative_keywords: Vec<String>,

    pub default_team: Option<String>,
    pub escalation_team: Option<String>,
    pub requires_senior: bool,
}

/// The eight seed categories the classifier's rule-based fallback and
/// priority scorer's category table are built around.
pub fn default_categories() -> Vec<Category> {
    let cat = |name: &str,
               display_name: &str,
               description: &str,
               priority_boost: i32,
               requires_senior: bool,
               is_default: bool,
               keywords: &[&str],
               sla_first_response_hours: f64,
               sla_resolution_hours: f64| Category {
        name: name.to_string(),
        display_name: display_name.to_string(),
        description: description.to_string(),
        is_active: true,
        is_default,
        priority_boost,
        sla_first_response_hours,
        sla_resolution_hours,
        keywords: keywords.iter().map(|s| s.to_string()).collect(),
        negative_keywords: Vec::new(),
        default_team: None,
        escalation_team: None,
        requires_senior,
    };

    vec![
        cat(
            "technical_issue",
            "Technical Issue",
            "Technical problems, errors, and system issues",
            1,
            false,
            false,
            &["error", "bug", "crash", "not working", "broken", "issue", "problem"],
            2.0,
            8.0,
        ),
        cat(
            "billing_question",
            "Billing Question",
            "Payment, invoice, and billing inquiries",
            0,
            false,
            false,
            &["invoice", "payment", "charge", "bill", "refund", "price"],
            4.0,
            24.0,
        ),
        cat(
            "feature_request",
            "Feature Request",
            "Suggestions for new features or improvements",
            -1,
            false,
            false,
            &["feature", "suggestion", "improvement", "add", "would be nice"],
            24.0,
            168.0,
        ),
        cat(
            "bug_report",
            "Bug Report",
            "Software bugs and defect reports",
            1,
            true,
            false,
            &["bug", "defect", "glitch", "malfunction", "unexpected behavior"],
            2.0,
            24.0,
        ),
        cat(
            "account_management",
            "Account Management",
            "Account settings, password, and profile issues",
            0,
            false,
            false,
            &["account", "password", "login", "profile", "settings", "access"],
            4.0,
            12.0,
        ),
        cat(
            "return_refund",
            "Return/Refund",
            "Product returns and refund requests",
            0,
            false,
            false,
            &["return", "refund", "money back", "cancel", "exchange"],
            4.0,
            48.0,
        ),
        cat(
            "general_inquiry",
            "General Inquiry",
            "General questions and information requests",
            0,
            false,
            true,
            &["question", "how", "what", "when", "where", "information"],
            8.0,
            48.0,
        ),
        cat(
            "complaint",
            "Complaint",
            "Customer complaints and negative feedback",
            2,
            true,
            false,
            &["complaint", "unhappy", "disappointed", "terrible", "worst", "unacceptable"],
            1.0,
            8.0,
        ),
    ]
}
