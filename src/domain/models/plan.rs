use chrono::Duration;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "plan_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    Trial,
    Starter,
    Business,
    Enterprise,
}

impl PlanKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanKind::Trial => "trial",
            PlanKind::Starter => "starter",
            PlanKind::Business => "business",
            PlanKind::Enterprise => "enterprise",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub kind: PlanKind,
    pub duration_days: i64,
    pub price_cents: i64,
    pub features: Vec<&'static str>,
}

impl Plan {
    pub fn duration(&self) -> Duration {
        Duration::days(self.duration_days)
    }
}

/// Immutable plan registry, built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    plans: Vec<Plan>,
}

impl PlanCatalog {
    /// The standard tiers: a 3-month trial with basic reporting only, and
    /// three 12-month paid tiers with cumulative feature sets.
    pub fn standard() -> Self {
        Self {
            plans: vec![
                Plan {
                    kind: PlanKind::Trial,
                    duration_days: 90,
                    price_cents: 0,
                    features: vec!["basic_reports"],
                },
                Plan {
                    kind: PlanKind::Starter,
                    duration_days: 365,
                    price_cents: 2900,
                    features: vec!["basic_reports", "products", "sales", "customers"],
                },
                Plan {
                    kind: PlanKind::Business,
                    duration_days: 365,
                    price_cents: 7900,
                    features: vec![
                        "basic_reports", "products", "sales", "customers",
                        "invoices", "suppliers", "expenses",
                    ],
                },
                Plan {
                    kind: PlanKind::Enterprise,
                    duration_days: 365,
                    price_cents: 19900,
                    features: vec![
                        "basic_reports", "products", "sales", "customers",
                        "invoices", "suppliers", "expenses",
                        "advanced_reports", "api_access",
                    ],
                },
            ],
        }
    }

    pub fn get(&self, kind: PlanKind) -> &Plan {
        self.plans.iter().find(|p| p.kind == kind)
            .expect("catalog contains every PlanKind")
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Plan> {
        self.plans.iter().find(|p| p.kind.as_str() == name)
    }

    pub fn all(&self) -> &[Plan] {
        &self.plans
    }
}
