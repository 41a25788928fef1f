//! Foreman CLI entry point.

use clap::Parser;
use std::path::PathBuf;
use std::process;
use std::time::Instant;

use foreman::cli::{
    Cli, Commands, ComponentCommands, EdgeCommands, GraphCommands, ProjectCommands,
    SystemCommands, ThrottleCommands,
};
use foreman::commands::{self, Output};
use foreman::{Result, action_log};

fn main() {
    let cli = Cli::parse();

    let workspace = match resolve_workspace(&cli) {
        Ok(path) => path,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let Some(command) = &cli.command else {
        eprintln!("No command given. Try `fm --help`.");
        process::exit(2);
    };

    let (name, args) = describe_command(command);
    let start = Instant::now();
    let result = run(command, &workspace);
    let duration_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(output) => {
            action_log::log_action(&workspace, &name, args, true, None, duration_ms);
            if cli.human_readable {
                println!("{}", output.human);
            } else {
                println!("{}", output.value);
            }
        }
        Err(e) => {
            action_log::log_action(&workspace, &name, args, false, Some(e.to_string()), duration_ms);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn resolve_workspace(cli: &Cli) -> std::io::Result<PathBuf> {
    match &cli.workspace {
        Some(path) => Ok(path.clone()),
        None => std::env::current_dir(),
    }
}

fn run(command: &Commands, workspace: &PathBuf) -> Result<Output> {
    match command {
        Commands::System { command } => match command {
            SystemCommands::Init => commands::system_init(workspace),
        },

        Commands::Interview {
            description,
            project,
        } => commands::interview(workspace, description, project.as_deref()),

        Commands::Refine {
            project_id,
            answers,
            context,
        } => commands::refine(workspace, project_id, answers, context),

        Commands::Design { project_id } => commands::design(workspace, project_id),

        Commands::Plan { project_id } => commands::plan(workspace, project_id),

        Commands::Project { command } => match command {
            ProjectCommands::List => commands::project_list(workspace),
            ProjectCommands::Show { id } => commands::project_show(workspace, id),
            ProjectCommands::Delete { id } => commands::project_delete(workspace, id),
        },

        Commands::Component { command } => match command {
            ComponentCommands::List { project_id } => {
                commands::component_list(workspace, project_id)
            }
            ComponentCommands::Show { id } => commands::component_show(workspace, id),
            ComponentCommands::Update {
                id,
                label,
                status,
                summary,
            } => commands::component_update(
                workspace,
                id,
                label.as_deref(),
                status.as_deref(),
                summary.as_deref(),
            ),
        },

        Commands::Edge { command } => match command {
            EdgeCommands::Add {
                project_id,
                from,
                to,
                label,
                kind,
            } => commands::edge_add(workspace, project_id, from, to, label, kind),
            EdgeCommands::Rm {
                project_id,
                from,
                to,
            } => commands::edge_rm(workspace, project_id, from, to),
            EdgeCommands::List { project_id } => commands::edge_list(workspace, project_id),
        },

        Commands::Graph { command } => match command {
            GraphCommands::Export { project_id } => commands::graph_export(workspace, project_id),
        },

        Commands::Throttle { command } => match command {
            ThrottleCommands::Status => commands::throttle_status(workspace),
        },

        Commands::Log { project_id, limit } => commands::logs(workspace, project_id, *limit),
    }
}

/// Serialize command name and arguments for the action log.
fn describe_command(command: &Commands) -> (String, serde_json::Value) {
    match command {
        Commands::System { command } => match command {
            SystemCommands::Init => ("system init".to_string(), serde_json::Value::Null),
        },
        Commands::Interview {
            description,
            project,
        } => (
            "interview".to_string(),
            serde_json::json!({"description_len": description.len(), "project": project}),
        ),
        Commands::Refine {
            project_id,
            answers,
            ..
        } => (
            "refine".to_string(),
            serde_json::json!({"project_id": project_id, "answers": answers.len()}),
        ),
        Commands::Design { project_id } => (
            "design".to_string(),
            serde_json::json!({"project_id": project_id}),
        ),
        Commands::Plan { project_id } => (
            "plan".to_string(),
            serde_json::json!({"project_id": project_id}),
        ),
        Commands::Project { command } => match command {
            ProjectCommands::List => ("project list".to_string(), serde_json::Value::Null),
            ProjectCommands::Show { id } => (
                "project show".to_string(),
                serde_json::json!({"id": id}),
            ),
            ProjectCommands::Delete { id } => (
                "project delete".to_string(),
                serde_json::json!({"id": id}),
            ),
        },
        Commands::Component { command } => match command {
            ComponentCommands::List { project_id } => (
                "component list".to_string(),
                serde_json::json!({"project_id": project_id}),
            ),
            ComponentCommands::Show { id } => (
                "component show".to_string(),
                serde_json::json!({"id": id}),
            ),
            ComponentCommands::Update { id, .. } => (
                "component update".to_string(),
                serde_json::json!({"id": id}),
            ),
        },
        Commands::Edge { command } => match command {
            EdgeCommands::Add {
                project_id,
                from,
                to,
                ..
            } => (
                "edge add".to_string(),
                serde_json::json!({"project_id": project_id, "from": from, "to": to}),
            ),
            EdgeCommands::Rm {
                project_id,
                from,
                to,
            } => (
                "edge rm".to_string(),
                serde_json::json!({"project_id": project_id, "from": from, "to": to}),
            ),
            EdgeCommands::List { project_id } => (
                "edge list".to_string(),
                serde_json::json!({"project_id": project_id}),
            ),
        },
        Commands::Graph { command } => match command {
            GraphCommands::Export { project_id } => (
                "graph export".to_string(),
                serde_json::json!({"project_id": project_id}),
            ),
        },
        Commands::Throttle { command } => match command {
            ThrottleCommands::Status => ("throttle status".to_string(), serde_json::Value::Null),
        },
        Commands::Log { project_id, limit } => (
            "log".to_string(),
            serde_json::json!({"project_id": project_id, "limit": limit}),
        ),
    }
}
