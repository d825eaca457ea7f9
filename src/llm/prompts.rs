use crate::store::{Customer, Interaction};
use std::fmt::Write;

/// Number of newest interactions (across all customers) the chat prompt sees.
pub const CHAT_INTERACTION_CONTEXT: usize = 10;

const CHAT_INSTRUCTIONS: &str = "Provide a concise, professional response in Markdown format. \
                                 If the query is about a specific customer, use their data. \
                                 For general queries, provide helpful information related to CRM or the app's features.";

const INSIGHT_INSTRUCTIONS: &str = "Make it dynamic, actionable, professional, and consider all provided data for tailored advice.\n\
                                    Output in Markdown format with sections like ## Overview, ## Recommendations, ## Next Steps, \
                                    using bold **text** for emphasis, lists - for items.";

fn or_na(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("N/A")
}

fn customer_snapshot(customers: &[Customer]) -> String {
    customers
        .iter()
        .map(|c| {
            format!(
                "ID: {}, Name: {}, Account: {}, Email: {}, Phone: {}",
                c.id,
                c.name,
                c.account,
                or_na(c.email.as_deref()),
                or_na(c.phone.as_deref())
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn interaction_notes(interactions: &[Interaction]) -> String {
    interactions
        .iter()
        .map(|i| format!("{}: {}", i.date, i.note))
        .collect::<Vec<_>>()
        .join("\n")
}

fn non_empty_or<'a>(text: &'a str, fallback: &'a str) -> &'a str {
    if text.is_empty() { fallback } else { text }
}

/// Prompt for the chat widget: the user's question plus a snapshot of every
/// customer and the most recent interactions.
pub fn chat_prompt(message: &str, customers: &[Customer], recent: &[Interaction]) -> String {
    let customer_data = customer_snapshot(customers);
    let interaction_data = recent
        .iter()
        .map(|i| format!("Date: {}, Note: {}", i.date, i.note))
        .collect::<Vec<_>>()
        .join("\n");

    let mut prompt = String::with_capacity(512 + customer_data.len() + interaction_data.len());
    let _ = write!(
        prompt,
        "You are an AI assistant for a Customer Relationship Manager. Answer the user's query: '{}'.\n\
         Customer data:\n{}\n\
         Recent interactions:\n{}\n",
        message,
        non_empty_or(&customer_data, "No customers available."),
        non_empty_or(&interaction_data, "No interactions available."),
    );
    prompt.push_str(CHAT_INSTRUCTIONS);
    prompt
}

/// Prompt for the structured insight page of one customer.
pub fn insight_prompt(customer: &Customer, interactions: &[Interaction]) -> String {
    let notes = interaction_notes(interactions);

    let mut prompt = String::with_capacity(768 + notes.len());
    let _ = write!(
        prompt,
        "Provide an advanced, personalized business insight or relationship management suggestion for customer '{}'.\n\
         Account: '{}', Email: '{}', Phone: '{}'.\n\
         Recent interactions:\n{}\n",
        customer.name,
        customer.account,
        or_na(customer.email.as_deref()),
        or_na(customer.phone.as_deref()),
        non_empty_or(&notes, "No interactions yet."),
    );
    prompt.push_str(INSIGHT_INSTRUCTIONS);
    prompt
}

/// Prompt for a free-text question about one customer.
pub fn custom_prompt(customer: &Customer, interactions: &[Interaction], question: &str) -> String {
    format!(
        "Based on customer '{}' data: Account '{}', Email '{}', Phone '{}'.\n\
         Interactions: {}.\n\
         Answer this query: {}\n\
         Output in Markdown.",
        customer.name,
        customer.account,
        or_na(customer.email.as_deref()),
        or_na(customer.phone.as_deref()),
        non_empty_or(&interaction_notes(interactions), "None"),
        question
    )
}
