//! Budget-based technology recommendation.

/// Budget tier derived from the budget range label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetTier {
    High,
    Mid,
    Low,
}

impl BudgetTier {
    /// Classify a budget label. High is checked first, so "$50,000 - $100,000"
    /// is high even though it also names a mid-tier bound.
    pub fn classify(budget: &str) -> Self {
        if ["$50,000", "$100,000", "Over"]
            .iter()
            .any(|marker| budget.contains(marker))
        {
            Self::High
        } else if ["$15,000", "$50,000"]
            .iter()
            .any(|marker| budget.contains(marker))
        {
            Self::Mid
        } else {
            Self::Low
        }
    }
}

/// Project family the recommendation depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectFamily {
    Mobile,
    ECommerce,
    Other,
}

impl ProjectFamily {
    pub fn classify(project_type: &str) -> Self {
        let lowered = project_type.to_lowercase();
        if lowered.contains("mobile") {
            Self::Mobile
        } else if lowered.contains("e-commerce") {
            Self::ECommerce
        } else {
            Self::Other
        }
    }
}

pub const NATIVE_MOBILE: &str = "With your budget, we can recommend native iOS/Android development for optimal performance and user experience.";
pub const CROSS_PLATFORM_MOBILE: &str = "React Native or Flutter would be great options for cross-platform development within your budget.";
pub const PWA_MOBILE: &str =
    "A progressive web app (PWA) might be the most cost-effective solution for mobile users.";
pub const CUSTOM_ECOMMERCE: &str =
    "We can build a custom e-commerce solution with advanced features and integrations.";
pub const HOSTED_ECOMMERCE: &str =
    "A customized Shopify or WooCommerce solution would work well within your budget.";
pub const TEMPLATE_ECOMMERCE: &str =
    "A template-based e-commerce solution with customizations would be most budget-friendly.";

/// Canned recommendation for a budget/project-type pair. Empty for project
/// types outside the mobile and e-commerce families.
pub fn recommend(budget: &str, project_type: &str) -> &'static str {
    match (ProjectFamily::classify(project_type), BudgetTier::classify(budget)) {
        (ProjectFamily::Mobile, BudgetTier::High) => NATIVE_MOBILE,
        (ProjectFamily::Mobile, BudgetTier::Mid) => CROSS_PLATFORM_MOBILE,
        (ProjectFamily::Mobile, BudgetTier::Low) => PWA_MOBILE,
        (ProjectFamily::ECommerce, BudgetTier::High) => CUSTOM_ECOMMERCE,
        (ProjectFamily::ECommerce, BudgetTier::Mid) => HOSTED_ECOMMERCE,
        (ProjectFamily::ECommerce, BudgetTier::Low) => TEMPLATE_ECOMMERCE,
        (ProjectFamily::Other, _) => "",
    }
}
