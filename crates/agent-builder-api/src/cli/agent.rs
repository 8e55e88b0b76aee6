//! Agent inspection commands: list, show, public.

use anyhow::Result;
use comfy_table::{presets, Cell, Color, ContentArrangement, Table};
use console::style;

use agent_builder_types::agent::{AgentStatus, AgentView};
use agent_builder_types::page::{AgentPage, PageRequest};
use agent_builder_types::user::Caller;

use super::PageArgs;
use crate::state::AppState;

/// List agents owned by `--user`.
pub async fn list_agents(state: &AppState, args: PageArgs, json: bool) -> Result<()> {
    let caller = Caller::new(&args.user);
    let page = state
        .agent_service
        .list_user_agents(&caller, &page_request(&args))
        .await?;

    print_page(&page, "agents", json)
}

/// List the public catalog as seen by `--user`.
pub async fn list_public(state: &AppState, args: PageArgs, json: bool) -> Result<()> {
    let caller = Caller::new(&args.user);
    let page = state
        .agent_service
        .list_public_agents(&caller, &page_request(&args))
        .await?;

    print_page(&page, "public agents", json)
}

/// Show the full definition of one agent.
pub async fn show_agent(state: &AppState, id: &str, user: &str, json: bool) -> Result<()> {
    let caller = Caller::new(user);
    let view = state.agent_service.get_agent(&caller, id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    let agent = &view.agent;
    println!();
    println!("  {}", style(&agent.name).cyan().bold());
    if !agent.description.is_empty() {
        println!("  {}", style(&agent.description).dim());
    }
    println!();

    println!("  {}", style("── Details ──").dim());
    println!("  {}          {}", style("ID:").bold(), agent.agent_id);
    println!("  {}       {}", style("Owner:").bold(), owner_label(&view));
    println!("  {}       {}", style("Model:").bold(), agent.model_id);
    println!("  {}  {}", style("Visibility:").bold(), visibility(&view));
    println!("  {}       {}", style("Stars:").bold(), agent.star_count);
    println!(
        "  {}    {}",
        style("Favorite:").bold(),
        if view.is_favorite { "yes" } else { "no" }
    );
    println!(
        "  {}   {}",
        style("Code exec:").bold(),
        if agent.code_execution_enabled { "enabled" } else { "disabled" }
    );
    println!(
        "  {}       {}",
        style("Tools:").bold(),
        join_or_none(&agent.mcp_servers)
    );
    println!("  {}        {}", style("Tags:").bold(), join_or_none(&agent.tags));
    println!(
        "  {}     {}",
        style("Created:").bold(),
        agent.created_at.format("%Y-%m-%d %H:%M UTC")
    );
    println!(
        "  {}     {}",
        style("Updated:").bold(),
        format_relative_time(&agent.updated_at)
    );
    println!();

    println!("  {}", style("── System prompt ──").dim());
    for line in agent.system_prompt.lines().take(8) {
        println!("  {line}");
    }
    if agent.system_prompt.lines().count() > 8 {
        println!("  {}", style("...").dim());
    }
    println!();

    Ok(())
}

fn page_request(args: &PageArgs) -> PageRequest {
    PageRequest {
        limit: args.limit,
        next_token: args.next_token.clone(),
    }
}

fn print_page(page: &AgentPage, noun: &str, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(page)?);
        return Ok(());
    }

    if page.agents.is_empty() {
        println!();
        println!("  {} No {noun} found.", style("i").blue().bold());
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Name").fg(Color::White),
        Cell::new("ID").fg(Color::White),
        Cell::new("Model").fg(Color::White),
        Cell::new("Visibility").fg(Color::White),
        Cell::new("Stars").fg(Color::White),
        Cell::new("Updated").fg(Color::White),
    ]);

    for view in &page.agents {
        let agent = &view.agent;
        let visibility_cell = match view.status {
            AgentStatus::Active if agent.is_public => Cell::new("● public").fg(Color::Green),
            AgentStatus::Active => Cell::new("○ private").fg(Color::Yellow),
            AgentStatus::Private => Cell::new("◌ unavailable").fg(Color::DarkGrey),
            AgentStatus::Deleted => Cell::new("✗ deleted").fg(Color::Red),
        };

        table.add_row(vec![
            Cell::new(truncate(&agent.name, 40)).fg(Color::Cyan),
            Cell::new(agent.agent_id.to_string()).fg(Color::White),
            Cell::new(&agent.model_id),
            visibility_cell,
            Cell::new(agent.star_count),
            Cell::new(format_relative_time(&agent.updated_at)).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} agent{}",
        style(page.agents.len()).bold(),
        if page.agents.len() == 1 { "" } else { "s" }
    );
    if let Some(token) = &page.next_token {
        println!(
            "  {} more available: {}",
            style("→").dim(),
            style(format!("--next-token {token}")).yellow()
        );
    }
    println!();

    Ok(())
}

fn owner_label(view: &AgentView) -> String {
    if view.is_my_agent {
        return "you".to_string();
    }
    match &view.agent.created_by_email {
        Some(email) => format!("{} <{}>", view.agent.created_by, email),
        None => view.agent.created_by.to_string(),
    }
}

fn visibility(view: &AgentView) -> &'static str {
    if view.agent.is_public { "public" } else { "private" }
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars - 3).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

fn format_relative_time(dt: &chrono::DateTime<chrono::Utc>) -> String {
    let diff = chrono::Utc::now() - *dt;

    if diff.num_seconds() < 60 {
        "just now".to_string()
    } else if diff.num_minutes() < 60 {
        format!("{}m ago", diff.num_minutes())
    } else if diff.num_hours() < 24 {
        format!("{}h ago", diff.num_hours())
    } else if diff.num_days() < 30 {
        format!("{}d ago", diff.num_days())
    } else {
        dt.format("%Y-%m-%d").to_string()
    }
}
