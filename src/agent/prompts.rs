//! Prompt composition for the agent turn pipeline
//!
//! Prompts are built per agent viewpoint from the shared history, which is
//! never mutated: [`project_history`] produces a fresh role-tagged sequence
//! in which the agent's own lines become `assistant` turns and everything
//! else becomes `user` turns.

use crate::types::{Agent, Message};

/// Pattern the model is asked to end its private thoughts with
pub const SPEAK_NEXT_PROB_TOKEN: &str = "speakNextProb";

/// Characters of the style exemplar included in the response prompt
pub const STYLE_EXCERPT_CHARS: usize = 2000;

const DEBATE_TECHNIQUES: &str = "\
Techniques for debate:
1. Respond to the other participants and address their points directly.
2. Offer criticism, agreement or counter-criticism where it is warranted.
3. Propose concrete actions, with conviction proportional to your confidence.
4. Converge on shared plans as the conversation matures.
5. Argue with energy.";

/// Line standing in for an empty history when thoughts are requested
pub fn opening_prompt(problem: &str) -> String {
    format!("Moderator: Let us begin by discussing {}.", problem)
}

/// First history line of a debate, welcoming the roster
pub fn opening_line(problem: &str, agents: &[Agent]) -> String {
    let names: Vec<&str> = agents.iter().map(|a| a.name.as_str()).collect();
    format!(
        "Moderator: Let us begin by discussing the topic '{}'. Welcome {}.",
        problem,
        names.join(", ")
    )
}

/// Project history lines onto roles from `agent`'s point of view
///
/// A line is the agent's own (`assistant`) when it contains the agent's
/// speaking marker, compared case-insensitively; every other line is `user`.
pub fn project_history(agent: &Agent, history: &[String]) -> Vec<Message> {
    let marker = agent.speaking_marker().to_lowercase();

    history
        .iter()
        .map(|line| {
            if line.to_lowercase().contains(&marker) {
                Message::assistant(line.as_str())
            } else {
                Message::user(line.as_str())
            }
        })
        .collect()
}

fn thoughts_system_prompt(agent: &Agent) -> String {
    format!(
        "You are {name}, and your biography is below. You are taking part in a \
discussion with a moderator and several other personalities about a given problem.

{techniques}

Bio:
```
{bio}
```
",
        name = agent.name,
        techniques = DEBATE_TECHNIQUES,
        bio = agent.bio,
    )
}

fn thoughts_request(agent: &Agent, problem: &str) -> String {
    format!(
        "The conversation is about \"{problem}\". What are your private thoughts, as {name}, \
about what you want to say next? Private thoughts are never shared; use them to reason \
about how to respond. Keep them condensed (bullet points are fine) and no longer than \
one paragraph.

Would {name} like to be the next one speaking? End with the probability that you want to \
speak next, in the format \"{token}: <float between 0 and 1>\"

{label}",
        problem = problem,
        name = agent.name,
        token = SPEAK_NEXT_PROB_TOKEN,
        label = agent.speaking_label(),
    )
}

fn response_system_prompt(agent: &Agent) -> String {
    let excerpt: String = agent.style_example.chars().take(STYLE_EXCERPT_CHARS).collect();

    format!(
        "You are {name}, and you are in a discussion with some people about a given problem. \
Use the speaking style description, the excerpts and anything else you know to sound as \
close as possible to the way {name} speaks. Listen to the moderator.

Excerpts:
```
{excerpt}
```

Speaking Style:
```
{summary}
```",
        name = agent.name,
        excerpt = excerpt,
        summary = agent.style_summary,
    )
}

fn response_request(agent: &Agent, thoughts: &str) -> String {
    format!(
        "Your internal thoughts about this discussion are:
```
{thoughts}
```

{techniques}

Respond now, assertively, to the conversation as {name}, and stop when {name} is done. \
Speak for one paragraph at most; shorter is better. Do not repeat yourself. Move the \
conversation forward using the techniques above. Bias towards action.",
        thoughts = thoughts,
        techniques = DEBATE_TECHNIQUES,
        name = agent.name,
    )
}

/// Messages for the private-thoughts call
pub fn thoughts_messages(agent: &Agent, problem: &str, history: &[String]) -> Vec<Message> {
    let mut messages = vec![Message::system(thoughts_system_prompt(agent))];

    if history.is_empty() {
        messages.push(Message::user(opening_prompt(problem)));
    } else {
        messages.extend(project_history(agent, history));
    }

    messages.push(Message::user(thoughts_request(agent, problem)));
    messages
}

/// Messages for the public-response call
pub fn response_messages(agent: &Agent, history: &[String], thoughts: &str) -> Vec<Message> {
    let mut messages = vec![Message::system(response_system_prompt(agent))];
    messages.extend(project_history(agent, history));
    messages.push(Message::user(response_request(agent, thoughts)));
    messages
}
