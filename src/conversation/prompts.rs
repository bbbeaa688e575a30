//! Scripted bot lines for each topic.

/// Opening line naming the client and their project type.
pub fn greeting(name: &str, project_type: &str) -> String {
    format!(
        "Hi {name}! I'm here to help clarify details about your {project_type} project. \
         I've reviewed your initial submission and have some targeted questions to ensure \
         we create the perfect brief for your development team."
    )
}

pub const FIRST_QUESTION: &str = "Let's start with your target audience. Who will be the primary users of this application? Please describe their demographics, technical skill level, and main goals.";

// ── Target audience ─────────────────────────────────────────────────────

pub const AUDIENCE_BUSINESS: &str = "Great! Since you're targeting business users, we'll focus on professional UI/UX and robust functionality. Now, what are the core features that are absolutely essential for your MVP? Please list the 3-5 most important features your users need.";
pub const AUDIENCE_CONSUMER: &str = "Perfect! For consumer-facing applications, we'll prioritize intuitive design and smooth user experience. What are the core features that are absolutely essential for your MVP? Please list the 3-5 most important features users need.";
pub const AUDIENCE_GENERAL: &str = "Thanks for that insight! Understanding your audience helps us design the right experience. Now, let's talk about functionality - what are the core features that are absolutely essential for your MVP? Please list the 3-5 most important features.";

pub const BUSINESS_MARKERS: [&str; 3] = ["business", "professional", "enterprise"];
pub const CONSUMER_MARKERS: [&str; 3] = ["consumer", "general public", "everyday"];

// ── Core features ───────────────────────────────────────────────────────

const DESIGN_QUESTION: &str = "do you have existing brand guidelines, or do you prefer a specific style? (e.g., modern/minimalist, colorful/vibrant, professional/corporate, etc.)";

pub fn features_with_accounts() -> String {
    format!("Excellent! I see user accounts are important. For design and user experience, {DESIGN_QUESTION}")
}

pub fn features_general() -> String {
    format!(
        "Great feature list! This gives me a clear picture of your app's functionality. \
         Now for design and user experience - {DESIGN_QUESTION}"
    )
}

pub const ACCOUNT_MARKERS: [&str; 3] = ["user", "account", "login"];

// ── Design preferences ──────────────────────────────────────────────────

const PLATFORM_QUESTION: &str = "What devices and platforms should this work on? Please specify: Desktop, Mobile (iOS/Android), Tablet, or should it be fully responsive across all devices?";

/// Acknowledge the design answer, inserting the budget recommendation when
/// there is one.
pub fn design_ack(recommendation: &str) -> String {
    if recommendation.is_empty() {
        format!("Perfect! {PLATFORM_QUESTION}")
    } else {
        format!("Perfect! {recommendation} {PLATFORM_QUESTION}")
    }
}

// ── Platform requirements ───────────────────────────────────────────────

const METRICS_QUESTION: &str = "Finally, how will you measure success for this project? What are your key performance indicators or goals? (e.g., user engagement, conversion rates, daily active users, revenue targets)";

pub fn platforms_with_integrations() -> String {
    format!("Great! I noticed you mentioned some integrations. {METRICS_QUESTION}")
}

pub fn platforms_general() -> String {
    format!(
        "Perfect! Understanding platform requirements helps us choose the right technology stack. {METRICS_QUESTION}"
    )
}

// ── Success metrics ─────────────────────────────────────────────────────

pub const WRAP_UP: &str = "Excellent! I now have all the information needed to create a comprehensive project brief. This includes your target audience insights, core feature requirements, design preferences, platform specifications, and success metrics. You'll be able to review and edit everything before we finalize your brief.";

/// True when `lowered` contains any of `markers`.
pub fn mentions_any(lowered: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| lowered.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greeting_names_client_and_project() {
        let text = greeting("Dana", "Mobile App");
        assert!(text.starts_with("Hi Dana!"));
        assert!(text.contains("Mobile App project"));
    }

    #[test]
    fn design_ack_without_recommendation_has_single_space() {
        let text = design_ack("");
        assert!(text.starts_with("Perfect! What devices"));
    }

    #[test]
    fn design_ack_embeds_recommendation() {
        let text = design_ack("Go native.");
        assert!(text.starts_with("Perfect! Go native. What devices"));
    }
}
