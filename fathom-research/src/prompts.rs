//! Prompt construction for planning, extraction, and synthesis

use crate::types::SerpQuery;

/// System prompt shared by every research LLM call
pub fn system_prompt() -> String {
    format!(
        r#"You are an expert researcher assisting a highly experienced analyst. Today is {}.

- Be accurate and thorough; do not simplify and do not pad.
- You may be shown information newer than your training data; treat it as correct.
- Value good arguments over authorities; the substance of a claim matters more than its source.
- Flag speculation clearly when you use it."#,
        chrono::Utc::now().format("%Y-%m-%d")
    )
}

/// Build the planning prompt asking for up to `max_queries` search queries
pub fn build_plan_prompt(topic: &str, max_queries: usize, prior_learnings: &[String]) -> String {
    let mut prompt = format!(
        r#"Given the research topic below, generate up to {} distinct web search queries that together cover the topic. Return fewer when the topic is already narrow. Make sure each query is unique and not similar to the others.

<topic>
{}
</topic>

Format your response as a JSON array of objects with the following structure:
[
  {{
    "query": "the search query to run",
    "researchGoal": "what this query should uncover and how to go deeper from its results"
  }}
]

Return only the JSON array."#,
        max_queries, topic
    );

    if !prior_learnings.is_empty() {
        prompt.push_str(
            "\n\nHere are learnings from earlier research, use them to make the queries more specific:\n",
        );
        prompt.push_str(&prior_learnings.join("\n"));
    }

    prompt
}

/// Wrap harvested content items in `<content>` tags for the extraction prompt
pub fn wrap_contents(contents: &[String]) -> String {
    contents
        .iter()
        .map(|content| format!("<content>\n{}\n</content>", content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the extraction prompt over an already-bounded contents block
pub fn build_extract_prompt(
    query: &str,
    contents_block: &str,
    max_learnings: usize,
    max_follow_ups: usize,
) -> String {
    format!(
        r#"Given the following contents retrieved for the search query <query>{}</query>, extract what was learned. Return at most {} learnings and at most {} follow-up questions for further research. Each learning must be unique, concise, and information dense; include entities, metrics, numbers, and dates where the contents mention them.

<contents>
{}
</contents>

Format your response as a JSON object with the following structure:
{{
  "learnings": ["first learning", "second learning"],
  "followUpQuestions": ["a direction worth a deeper pass"]
}}

Return only the JSON object."#,
        query, max_learnings, max_follow_ups, contents_block
    )
}

/// Build the narrative for the next recursion level from a finished branch
pub fn build_next_prompt(query: &SerpQuery, follow_ups: &[String]) -> String {
    let mut prompt = format!("Previous research goal: {}", query.research_goal);
    if !follow_ups.is_empty() {
        prompt.push_str("\nFollow-up research directions:\n");
        prompt.push_str(&follow_ups.join("\n"));
    }
    prompt
}

/// Wrap learnings in `<learning>` tags for the synthesis prompts
pub fn wrap_learnings(learnings: &[String]) -> String {
    learnings
        .iter()
        .map(|learning| format!("<learning>\n{}\n</learning>", learning))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the final-report prompt over an already-bounded learnings block
pub fn build_report_prompt(topic: &str, learnings_block: &str) -> String {
    format!(
        r#"Given the research topic below, write a final report using the learnings from research. Make it detailed, aim for three or more pages, and include every learning.

<topic>
{}
</topic>

Here are the learnings gathered during research:

<learnings>
{}
</learnings>

Format your response as a JSON object with the following structure:
{{
  "reportMarkdown": "the full report in markdown"
}}

Return only the JSON object."#,
        topic, learnings_block
    )
}

/// Build the short-answer prompt over an already-bounded learnings block
pub fn build_answer_prompt(topic: &str, learnings_block: &str) -> String {
    format!(
        r#"Given the research topic below, give a short and concise answer using the learnings from research. Follow any answer format the topic itself asks for. Keep it to the answer alone, no surrounding text.

<topic>
{}
</topic>

Here are the learnings gathered during research:

<learnings>
{}
</learnings>

Format your response as a JSON object with the following structure:
{{
  "exactAnswer": "the answer"
}}

Return only the JSON object."#,
        topic, learnings_block
    )
}
