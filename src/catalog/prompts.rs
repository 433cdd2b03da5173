//! Prompts and their argument completers

use std::collections::HashMap;
use std::sync::Arc;

use crate::mcp::protocol::{CompletionContext, Message, PromptArgument, PromptDescriptor};
use crate::mcp::registry::Completer;

pub const GENERATE_FAKE_USER: &str = "generate-fake-user";
pub const WELCOME_NEW_HIRE: &str = "welcome-new-hire";

/// Departments and the people in each, used for dependent completion
const ROSTER: &[(&str, &[&str])] = &[
    ("engineering", &["Ada Lovelace", "Alan Turing", "Grace Hopper", "Linus Torvalds"]),
    ("marketing", &["Don Draper", "Peggy Olson", "Mary Wells"]),
    ("sales", &["Dale Carnegie", "Zig Ziglar", "Mary Kay Ash"]),
    ("support", &["Florence Nightingale", "Fred Rogers"]),
];

pub fn generate_fake_user_descriptor() -> PromptDescriptor {
    PromptDescriptor {
        name: GENERATE_FAKE_USER.to_string(),
        description: Some("Generate a fake user based on a given name".to_string()),
        arguments: vec![PromptArgument {
            name: "name".to_string(),
            description: Some("The name of the user to generate".to_string()),
            required: true,
        }],
    }
}

pub fn generate_fake_user(args: &HashMap<String, String>) -> Vec<Message> {
    let name = args.get("name").map(String::as_str).unwrap_or_default();
    vec![Message::user_text(format!(
        "Generate a fake user with the name {}. The user should have a realistic email, address, and phone number.",
        name
    ))]
}

pub fn welcome_new_hire_descriptor() -> PromptDescriptor {
    PromptDescriptor {
        name: WELCOME_NEW_HIRE.to_string(),
        description: Some("Draft a welcome note for someone joining a department".to_string()),
        arguments: vec![
            PromptArgument {
                name: "department".to_string(),
                description: Some("Department the person is joining".to_string()),
                required: true,
            },
            PromptArgument {
                name: "name".to_string(),
                description: Some("Name of the new hire".to_string()),
                required: true,
            },
        ],
    }
}

pub fn welcome_new_hire(args: &HashMap<String, String>) -> Vec<Message> {
    let department = args.get("department").map(String::as_str).unwrap_or_default();
    let name = args.get("name").map(String::as_str).unwrap_or_default();
    vec![Message::user_text(format!(
        "Write a short, friendly welcome note for {} who is joining the {} team. Mention one thing they can look forward to in their first week.",
        name, department
    ))]
}

fn prefix_matches<'a>(candidates: impl Iterator<Item = &'a str>, partial: &str) -> Vec<String> {
    let partial = partial.to_lowercase();
    candidates
        .filter(|c| c.to_lowercase().starts_with(&partial))
        .map(String::from)
        .collect()
}

/// Departments whose name starts with `partial` (case-insensitive)
pub fn complete_department(partial: &str, _context: &CompletionContext) -> Vec<String> {
    prefix_matches(ROSTER.iter().map(|(dept, _)| *dept), partial)
}

/// Names in the department already chosen in `context`; every known name
/// when no department has been chosen yet
pub fn complete_name(partial: &str, context: &CompletionContext) -> Vec<String> {
    let department = context
        .arguments
        .get("department")
        .map(|d| d.to_lowercase());
    let names = ROSTER
        .iter()
        .filter(|(dept, _)| department.as_deref().map_or(true, |d| *dept == d))
        .flat_map(|(_, names)| names.iter().copied());
    prefix_matches(names, partial)
}

pub fn welcome_new_hire_completers() -> HashMap<String, Completer> {
    let mut completers: HashMap<String, Completer> = HashMap::new();
    completers.insert("department".to_string(), Arc::new(complete_department));
    completers.insert("name".to_string(), Arc::new(complete_name));
    completers
}
