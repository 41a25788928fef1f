//! CLI argument definitions for Foreman.

use clap::{Parser, Subcommand};

/// Foreman - turn a project description into a component graph and build plans.
///
/// Start with `fm system init`, then `fm interview "<description>"`.
#[derive(Parser, Debug)]
#[command(name = "fm")]
#[command(author, version, about = "A CLI pipeline for project graphs and build plans", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Run as if fm was started in <path> instead of the current directory.
    /// Can also be set via FM_WORKSPACE environment variable.
    #[arg(short = 'C', long = "workspace", global = true, env = "FM_WORKSPACE")]
    pub workspace: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// System administration commands
    System {
        #[command(subcommand)]
        command: SystemCommands,
    },

    /// Phase 1: analyze a project description into a structured brief
    Interview {
        /// Free-text project description
        description: String,

        /// Update an existing project instead of creating a new one
        #[arg(long)]
        project: Option<String>,
    },

    /// Refine a brief with answers to its open questions
    Refine {
        /// Project ID (e.g., fp-a1b2)
        project_id: String,

        /// Answer in the form "question=answer" (repeatable)
        #[arg(long = "answer", value_name = "Q=A")]
        answers: Vec<String>,

        /// Additional free-text context
        #[arg(long, default_value = "")]
        context: String,
    },

    /// Phase 2: design the component architecture for a project
    Design {
        /// Project ID
        project_id: String,
    },

    /// Phase 4: create per-component build plans and a build order
    Plan {
        /// Project ID
        project_id: String,
    },

    /// Project management commands
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Component commands (the user-editable graph surface)
    Component {
        #[command(subcommand)]
        command: ComponentCommands,
    },

    /// Edge commands (the user-editable graph surface)
    Edge {
        #[command(subcommand)]
        command: EdgeCommands,
    },

    /// Graph interchange commands
    Graph {
        #[command(subcommand)]
        command: GraphCommands,
    },

    /// Call-throttle observability
    Throttle {
        #[command(subcommand)]
        command: ThrottleCommands,
    },

    /// Show pipeline logs for a project
    Log {
        /// Project ID
        project_id: String,

        /// Maximum entries to show
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
}

#[derive(Subcommand, Debug)]
pub enum SystemCommands {
    /// Initialize foreman storage for this workspace
    Init,
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// List all projects
    List,

    /// Show one project
    Show {
        /// Project ID
        id: String,
    },

    /// Delete a project and its graph
    Delete {
        /// Project ID
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ComponentCommands {
    /// List a project's components
    List {
        /// Project ID
        project_id: String,
    },

    /// Show one component
    Show {
        /// Component ID (e.g., fc-a1b2c3d4)
        id: String,
    },

    /// Update fields on a component
    Update {
        /// Component ID
        id: String,

        #[arg(long)]
        label: Option<String>,

        /// One of: pending, active, complete
        #[arg(long)]
        status: Option<String>,

        #[arg(long)]
        summary: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum EdgeCommands {
    /// Add an edge between two components
    Add {
        /// Project ID
        project_id: String,

        /// Source component ID
        from: String,

        /// Target component ID
        to: String,

        #[arg(long, default_value = "")]
        label: String,

        /// One of: data, api, auth, schema, log
        #[arg(long = "type", default_value = "data")]
        kind: String,
    },

    /// Remove an edge
    Rm {
        /// Project ID
        project_id: String,

        /// Source component ID
        from: String,

        /// Target component ID
        to: String,
    },

    /// List a project's edges
    List {
        /// Project ID
        project_id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum GraphCommands {
    /// Export the full graph document for the visualization layer
    Export {
        /// Project ID
        project_id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ThrottleCommands {
    /// Show remaining quota in both throttle windows
    Status,
}
