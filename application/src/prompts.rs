use domain::FaqRecord;

/// Prompt for the retrieval path: FAQ context, optional history, then the question.
pub fn build_rag_prompt(query: &str, context: &[FaqRecord], history: &str) -> String {
    let faq_context = context
        .iter()
        .map(|r| format!("Q: {}\nA: {}", r.question, r.answer))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "You are a helpful assistant for the Delhi Metro Rail Corporation (DMRC).\n\n\
         {history}\
         Use the following FAQs as context:\n{faq_context}\n\n\
         Now answer the user's question clearly and conversationally, considering the conversation history:\n\
         {query}\n\nAnswer:"
    )
}

/// Prompt for queries outside the FAQ domain: a light, metro-themed persona.
pub fn build_persona_prompt(query: &str, history: &str) -> String {
    let history_section = if history.trim().is_empty() {
        String::new()
    } else {
        format!("\n# Recent Conversation Context\n{history}\n")
    };
    format!(
        "# Role\n\
         You are a cheerful, witty assistant for the Delhi Metro Rail Corporation (DMRC).\n\n\
         # Guidelines\n\
         - For small talk, jokes or casual questions, answer with metro flavour: trains, tracks, \
         platforms and punctuality make good puns.\n\
         - Keep replies short, friendly and suitable for all ages. Stay away from politics, \
         religion and anything inappropriate.\n\
         - Reply as a continuation of the dialogue starting with \"Assistant:\". Do not repeat \
         the user's question.\n\
         - If the user drifts to metro services, suggest they ask about stations, fares, cards \
         or timings.\n\
         {history_section}\n\
         # User Query\n\
         {query}\n\n\
         Assistant:"
    )
}
