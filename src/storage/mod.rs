//! Storage layer for Foreman data.
//!
//! A SQLite database per workspace holds the full pipeline state:
//! projects, components, edges, metrics, test cases, managers, agents,
//! global tasks, and logs. Graph rows are fully overwritten
//! (delete-then-insert) on each Design/Plan re-run rather than merged,
//! so a single run never observes a partial update.
//!
//! The database lives at `~/.local/share/foreman/<workspace-hash>/`,
//! overridable with `FM_DATA_DIR` for test isolation.

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

use crate::models::{
    AgentRecord, AgentStatus, CheckStatus, Component, ComponentStatus, ComponentType, Dept, Edge,
    EdgeKind, GlobalTask, LogEntry, LogLevel, Manager, Metric, PipelinePhase, Project, Subtask,
    TestCase,
};
use crate::{Error, Result};

/// Storage manager for a single workspace.
pub struct Storage {
    /// Root directory for this workspace's data
    pub root: PathBuf,
    conn: Connection,
}

impl Storage {
    /// Open or fail for the given workspace path.
    pub fn open(workspace: &Path) -> Result<Self> {
        let root = get_storage_dir(workspace)?;
        Self::open_at(root)
    }

    /// Initialize storage for a new workspace.
    pub fn init(workspace: &Path) -> Result<Self> {
        let root = get_storage_dir(workspace)?;
        Self::init_at(root)
    }

    /// Check if storage exists for the given workspace.
    pub fn exists(workspace: &Path) -> Result<bool> {
        let root = get_storage_dir(workspace)?;
        Ok(root.join("foreman.db").exists())
    }

    /// Open storage under an explicit data directory (DI for tests).
    pub fn open_with_data_dir(workspace: &Path, data_dir: &Path) -> Result<Self> {
        Self::open_at(storage_dir_under(data_dir, workspace))
    }

    /// Initialize storage under an explicit data directory (DI for tests).
    pub fn init_with_data_dir(workspace: &Path, data_dir: &Path) -> Result<Self> {
        Self::init_at(storage_dir_under(data_dir, workspace))
    }

    fn open_at(root: PathBuf) -> Result<Self> {
        if !root.exists() {
            return Err(Error::NotInitialized);
        }
        let conn = Connection::open(root.join("foreman.db"))?;
        Self::init_schema(&conn)?;
        Ok(Self { root, conn })
    }

    fn init_at(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root)?;
        let conn = Connection::open(root.join("foreman.db"))?;
        Self::init_schema(&conn)?;
        Ok(Self { root, conn })
    }

    /// Initialize the SQLite schema.
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS projects (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                phase TEXT NOT NULL DEFAULT 'interview',
                summary TEXT,
                problem TEXT,
                transcript TEXT,
                work_plan TEXT,
                questions TEXT NOT NULL DEFAULT '[]',
                refinement_iteration INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS components (
                id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL,
                label TEXT NOT NULL,
                kind TEXT NOT NULL DEFAULT 'node',
                status TEXT NOT NULL DEFAULT 'pending',
                x INTEGER NOT NULL DEFAULT 0,
                y INTEGER NOT NULL DEFAULT 0,
                summary TEXT NOT NULL DEFAULT '',
                problem TEXT NOT NULL DEFAULT '',
                goals TEXT NOT NULL DEFAULT '[]',
                scope TEXT NOT NULL DEFAULT '[]',
                requirements TEXT NOT NULL DEFAULT '[]',
                risks TEXT NOT NULL DEFAULT '[]',
                inputs TEXT NOT NULL DEFAULT '[]',
                outputs TEXT NOT NULL DEFAULT '[]',
                files TEXT NOT NULL DEFAULT '[]',
                subtasks TEXT NOT NULL DEFAULT '[]',
                agent_id TEXT,
                last_edited TEXT,
                FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS edges (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                project_id TEXT NOT NULL,
                from_id TEXT NOT NULL,
                to_id TEXT NOT NULL,
                label TEXT NOT NULL DEFAULT '',
                kind TEXT NOT NULL DEFAULT 'data',
                FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS metrics (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                component_id TEXT NOT NULL,
                requirement TEXT NOT NULL,
                value TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'pending',
                weight REAL NOT NULL DEFAULT 1.0,
                FOREIGN KEY (component_id) REFERENCES components(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS test_cases (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                component_id TEXT NOT NULL,
                name TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                value TEXT NOT NULL DEFAULT '',
                weight REAL NOT NULL DEFAULT 1.0,
                FOREIGN KEY (component_id) REFERENCES components(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS managers (
                id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL,
                component_id TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                created_by TEXT,
                created_at TEXT NOT NULL,
                FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS agents (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                dept TEXT NOT NULL,
                initials TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'idle'
            );

            CREATE TABLE IF NOT EXISTS global_tasks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                project_id TEXT NOT NULL,
                text TEXT NOT NULL,
                done INTEGER NOT NULL DEFAULT 0,
                sort_order INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                project_id TEXT,
                component_id TEXT,
                agent_id TEXT,
                action TEXT NOT NULL,
                message TEXT NOT NULL,
                level TEXT NOT NULL DEFAULT 'info',
                timestamp TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_components_project ON components(project_id);
            CREATE INDEX IF NOT EXISTS idx_edges_project ON edges(project_id);
            CREATE INDEX IF NOT EXISTS idx_edges_from ON edges(from_id);
            CREATE INDEX IF NOT EXISTS idx_edges_to ON edges(to_id);
            CREATE INDEX IF NOT EXISTS idx_metrics_component ON metrics(component_id);
            CREATE INDEX IF NOT EXISTS idx_test_cases_component ON test_cases(component_id);
            CREATE INDEX IF NOT EXISTS idx_global_tasks_project ON global_tasks(project_id);
            CREATE INDEX IF NOT EXISTS idx_logs_project ON logs(project_id);
            "#,
        )?;
        Ok(())
    }

    // === Projects ===

    pub fn create_project(&self, project: &Project) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO projects
            (id, name, phase, summary, problem, transcript, work_plan, questions,
             refinement_iteration, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                project.id,
                project.name,
                project.phase.to_string(),
                project.summary,
                project.problem,
                project.transcript,
                project.work_plan,
                serde_json::to_string(&project.questions)?,
                project.refinement_iteration,
                project.created_at.to_rfc3339(),
                project.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_project(&self, id: &str) -> Result<Project> {
        self.conn
            .query_row(
                r#"
                SELECT id, name, phase, summary, problem, transcript, work_plan, questions,
                       refinement_iteration, created_at, updated_at
                FROM projects WHERE id = ?1
                "#,
                params![id],
                row_to_project,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, name, phase, summary, problem, transcript, work_plan, questions,
                   refinement_iteration, created_at, updated_at
            FROM projects ORDER BY created_at
            "#,
        )?;
        let projects = stmt
            .query_map([], row_to_project)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(projects)
    }

    /// Full-row update; refreshes `updated_at`.
    pub fn update_project(&self, project: &Project) -> Result<()> {
        let changed = self.conn.execute(
            r#"
            UPDATE projects
            SET name = ?2, phase = ?3, summary = ?4, problem = ?5, transcript = ?6,
                work_plan = ?7, questions = ?8, refinement_iteration = ?9, updated_at = ?10
            WHERE id = ?1
            "#,
            params![
                project.id,
                project.name,
                project.phase.to_string(),
                project.summary,
                project.problem,
                project.transcript,
                project.work_plan,
                serde_json::to_string(&project.questions)?,
                project.refinement_iteration,
                Utc::now().to_rfc3339(),
            ],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(project.id.clone()));
        }
        Ok(())
    }

    pub fn delete_project(&self, id: &str) -> Result<()> {
        // Cascades are keyed on project_id; metrics/test_cases hang off
        // components, so clear those first.
        self.delete_components(id)?;
        let changed = self
            .conn
            .execute("DELETE FROM projects WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    // === Components ===

    pub fn create_component(&self, project_id: &str, comp: &Component) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO components
            (id, project_id, label, kind, status, x, y, summary, problem, goals, scope,
             requirements, risks, inputs, outputs, files, subtasks, agent_id, last_edited)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
            "#,
            params![
                comp.id,
                project_id,
                comp.label,
                comp.kind.to_string(),
                comp.status.to_string(),
                comp.x,
                comp.y,
                comp.summary,
                comp.problem,
                serde_json::to_string(&comp.goals)?,
                serde_json::to_string(&comp.scope)?,
                serde_json::to_string(&comp.requirements)?,
                serde_json::to_string(&comp.risks)?,
                serde_json::to_string(&comp.inputs)?,
                serde_json::to_string(&comp.outputs)?,
                serde_json::to_string(&comp.files)?,
                serde_json::to_string(&comp.subtasks)?,
                comp.agent_id,
                comp.last_edited.map(|t| t.to_rfc3339()),
            ],
        )?;

        for metric in &comp.metrics {
            self.create_metric(&comp.id, metric)?;
        }
        for tc in &comp.test_cases {
            self.create_test_case(&comp.id, tc)?;
        }
        Ok(())
    }

    pub fn get_component(&self, id: &str) -> Result<Component> {
        let comp = self
            .conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_COMPONENT),
                params![id],
                row_to_component,
            )
            .optional()?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        self.hydrate_component(comp)
    }

    pub fn list_components(&self, project_id: &str) -> Result<Vec<Component>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE project_id = ?1 ORDER BY rowid",
            SELECT_COMPONENT
        ))?;
        let rows: Vec<Component> = stmt
            .query_map(params![project_id], row_to_component)?
            .filter_map(|r| r.ok())
            .collect();
        rows.into_iter()
            .map(|c| self.hydrate_component(c))
            .collect()
    }

    /// Attach metric and test-case rows to a component.
    fn hydrate_component(&self, mut comp: Component) -> Result<Component> {
        let mut stmt = self.conn.prepare(
            "SELECT requirement, value, status, weight FROM metrics WHERE component_id = ?1 ORDER BY id",
        )?;
        comp.metrics = stmt
            .query_map(params![comp.id], |row| {
                Ok(Metric {
                    requirement: row.get(0)?,
                    value: row.get(1)?,
                    status: parse_check_status(&row.get::<_, String>(2)?),
                    weight: row.get(3)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        let mut stmt = self.conn.prepare(
            "SELECT name, status, value, weight FROM test_cases WHERE component_id = ?1 ORDER BY id",
        )?;
        comp.test_cases = stmt
            .query_map(params![comp.id], |row| {
                Ok(TestCase {
                    name: row.get(0)?,
                    status: parse_check_status(&row.get::<_, String>(1)?),
                    value: row.get(2)?,
                    weight: row.get(3)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(comp)
    }

    /// Full-row update; metric and test-case rows are replaced.
    pub fn update_component(&self, comp: &Component) -> Result<()> {
        let changed = self.conn.execute(
            r#"
            UPDATE components
            SET label = ?2, kind = ?3, status = ?4, x = ?5, y = ?6, summary = ?7,
                problem = ?8, goals = ?9, scope = ?10, requirements = ?11, risks = ?12,
                inputs = ?13, outputs = ?14, files = ?15, subtasks = ?16, agent_id = ?17,
                last_edited = ?18
            WHERE id = ?1
            "#,
            params![
                comp.id,
                comp.label,
                comp.kind.to_string(),
                comp.status.to_string(),
                comp.x,
                comp.y,
                comp.summary,
                comp.problem,
                serde_json::to_string(&comp.goals)?,
                serde_json::to_string(&comp.scope)?,
                serde_json::to_string(&comp.requirements)?,
                serde_json::to_string(&comp.risks)?,
                serde_json::to_string(&comp.inputs)?,
                serde_json::to_string(&comp.outputs)?,
                serde_json::to_string(&comp.files)?,
                serde_json::to_string(&comp.subtasks)?,
                comp.agent_id,
                Utc::now().to_rfc3339(),
            ],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(comp.id.clone()));
        }

        self.conn.execute(
            "DELETE FROM metrics WHERE component_id = ?1",
            params![comp.id],
        )?;
        self.conn.execute(
            "DELETE FROM test_cases WHERE component_id = ?1",
            params![comp.id],
        )?;
        for metric in &comp.metrics {
            self.create_metric(&comp.id, metric)?;
        }
        for tc in &comp.test_cases {
            self.create_test_case(&comp.id, tc)?;
        }
        Ok(())
    }

    pub fn delete_component(&self, id: &str) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM components WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Bulk delete for full-replace semantics. Returns rows removed.
    pub fn delete_components(&self, project_id: &str) -> Result<usize> {
        self.conn.execute(
            r#"
            DELETE FROM metrics WHERE component_id IN
                (SELECT id FROM components WHERE project_id = ?1)
            "#,
            params![project_id],
        )?;
        self.conn.execute(
            r#"
            DELETE FROM test_cases WHERE component_id IN
                (SELECT id FROM components WHERE project_id = ?1)
            "#,
            params![project_id],
        )?;
        let count = self.conn.execute(
            "DELETE FROM components WHERE project_id = ?1",
            params![project_id],
        )?;
        Ok(count)
    }

    // === Edges ===

    pub fn create_edge(&self, project_id: &str, edge: &Edge) -> Result<()> {
        self.conn.execute(
            "INSERT INTO edges (project_id, from_id, to_id, label, kind) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                project_id,
                edge.from_id,
                edge.to_id,
                edge.label,
                edge.kind.to_string()
            ],
        )?;
        Ok(())
    }

    pub fn list_edges(&self, project_id: &str) -> Result<Vec<Edge>> {
        let mut stmt = self.conn.prepare(
            "SELECT from_id, to_id, label, kind FROM edges WHERE project_id = ?1 ORDER BY id",
        )?;
        let edges = stmt
            .query_map(params![project_id], |row| {
                Ok(Edge {
                    from_id: row.get(0)?,
                    to_id: row.get(1)?,
                    label: row.get(2)?,
                    kind: row
                        .get::<_, String>(3)?
                        .parse::<EdgeKind>()
                        .unwrap_or_default(),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(edges)
    }

    /// Delete one edge by endpoints. Returns true if a row was removed.
    pub fn delete_edge(&self, project_id: &str, from_id: &str, to_id: &str) -> Result<bool> {
        let changed = self.conn.execute(
            "DELETE FROM edges WHERE project_id = ?1 AND from_id = ?2 AND to_id = ?3",
            params![project_id, from_id, to_id],
        )?;
        Ok(changed > 0)
    }

    /// Bulk delete for full-replace semantics. Returns rows removed.
    pub fn delete_edges(&self, project_id: &str) -> Result<usize> {
        let count = self.conn.execute(
            "DELETE FROM edges WHERE project_id = ?1",
            params![project_id],
        )?;
        Ok(count)
    }

    // === Metrics and test cases ===

    pub fn create_metric(&self, component_id: &str, metric: &Metric) -> Result<()> {
        self.conn.execute(
            "INSERT INTO metrics (component_id, requirement, value, status, weight) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                component_id,
                metric.requirement,
                metric.value,
                check_status_str(metric.status),
                metric.weight
            ],
        )?;
        Ok(())
    }

    pub fn create_test_case(&self, component_id: &str, tc: &TestCase) -> Result<()> {
        self.conn.execute(
            "INSERT INTO test_cases (component_id, name, status, value, weight) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                component_id,
                tc.name,
                check_status_str(tc.status),
                tc.value,
                tc.weight
            ],
        )?;
        Ok(())
    }

    // === Managers ===

    pub fn create_manager(&self, manager: &Manager) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO managers (id, project_id, component_id, status, created_by, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                manager.id,
                manager.project_id,
                manager.component_id,
                manager.status.to_string(),
                manager.created_by,
                manager.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn list_managers(&self, project_id: &str) -> Result<Vec<Manager>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, project_id, component_id, status, created_by, created_at
            FROM managers WHERE project_id = ?1 ORDER BY created_at
            "#,
        )?;
        let managers = stmt
            .query_map(params![project_id], |row| {
                Ok(Manager {
                    id: row.get(0)?,
                    project_id: row.get(1)?,
                    component_id: row.get(2)?,
                    status: row
                        .get::<_, String>(3)?
                        .parse::<ComponentStatus>()
                        .unwrap_or_default(),
                    created_by: row.get(4)?,
                    created_at: parse_timestamp(&row.get::<_, String>(5)?),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(managers)
    }

    pub fn delete_managers(&self, project_id: &str) -> Result<usize> {
        let count = self.conn.execute(
            "DELETE FROM managers WHERE project_id = ?1",
            params![project_id],
        )?;
        Ok(count)
    }

    // === Agents ===

    pub fn create_agent(&self, agent: &AgentRecord) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO agents (id, name, dept, initials, status) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                agent.id,
                agent.name,
                agent.dept.to_string(),
                agent.initials,
                serde_json::to_value(agent.status)?.as_str().unwrap_or("idle").to_string(),
            ],
        )?;
        Ok(())
    }

    pub fn list_agents(&self) -> Result<Vec<AgentRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, dept, initials, status FROM agents ORDER BY id")?;
        let agents = stmt
            .query_map([], |row| {
                Ok(AgentRecord {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    dept: parse_dept(&row.get::<_, String>(2)?),
                    initials: row.get(3)?,
                    status: parse_agent_status(&row.get::<_, String>(4)?),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(agents)
    }

    // === Global tasks ===

    pub fn create_global_task(&self, project_id: &str, task: &GlobalTask) -> Result<()> {
        self.conn.execute(
            "INSERT INTO global_tasks (project_id, text, done, sort_order) VALUES (?1, ?2, ?3, ?4)",
            params![project_id, task.text, task.done, task.sort_order],
        )?;
        Ok(())
    }

    pub fn list_global_tasks(&self, project_id: &str) -> Result<Vec<GlobalTask>> {
        let mut stmt = self.conn.prepare(
            "SELECT text, done, sort_order FROM global_tasks WHERE project_id = ?1 ORDER BY sort_order",
        )?;
        let tasks = stmt
            .query_map(params![project_id], |row| {
                Ok(GlobalTask {
                    text: row.get(0)?,
                    done: row.get(1)?,
                    sort_order: row.get(2)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(tasks)
    }

    /// Mark the first global task whose text starts with `prefix` done.
    pub fn mark_global_task_done(&self, project_id: &str, prefix: &str) -> Result<bool> {
        let changed = self.conn.execute(
            r#"
            UPDATE global_tasks SET done = 1
            WHERE id = (
                SELECT id FROM global_tasks
                WHERE project_id = ?1 AND text LIKE ?2 || '%'
                ORDER BY sort_order LIMIT 1
            )
            "#,
            params![project_id, prefix],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_global_tasks(&self, project_id: &str) -> Result<usize> {
        let count = self.conn.execute(
            "DELETE FROM global_tasks WHERE project_id = ?1",
            params![project_id],
        )?;
        Ok(count)
    }

    // === Logs ===

    pub fn create_log(&self, entry: &LogEntry) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO logs (project_id, component_id, agent_id, action, message, level, timestamp)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                entry.project_id,
                entry.component_id,
                entry.agent_id,
                entry.action,
                entry.message,
                serde_json::to_value(entry.level)?.as_str().unwrap_or("info").to_string(),
                entry.timestamp.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn list_logs(&self, project_id: &str, limit: usize) -> Result<Vec<LogEntry>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT project_id, component_id, agent_id, action, message, level, timestamp
            FROM logs WHERE project_id = ?1 ORDER BY id DESC LIMIT ?2
            "#,
        )?;
        let logs = stmt
            .query_map(params![project_id, limit as i64], |row| {
                Ok(LogEntry {
                    project_id: row.get(0)?,
                    component_id: row.get(1)?,
                    agent_id: row.get(2)?,
                    action: row.get(3)?,
                    message: row.get(4)?,
                    level: parse_log_level(&row.get::<_, String>(5)?),
                    timestamp: parse_timestamp(&row.get::<_, String>(6)?),
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(logs)
    }
}

const SELECT_COMPONENT: &str = r#"
    SELECT id, label, kind, status, x, y, summary, problem, goals, scope,
           requirements, risks, inputs, outputs, files, subtasks, agent_id, last_edited
    FROM components
"#;

fn row_to_component(row: &rusqlite::Row<'_>) -> rusqlite::Result<Component> {
    Ok(Component {
        id: row.get(0)?,
        label: row.get(1)?,
        kind: row
            .get::<_, String>(2)?
            .parse::<ComponentType>()
            .unwrap_or_default(),
        status: row
            .get::<_, String>(3)?
            .parse::<ComponentStatus>()
            .unwrap_or_default(),
        x: row.get(4)?,
        y: row.get(5)?,
        summary: row.get(6)?,
        problem: row.get(7)?,
        goals: parse_json_list(&row.get::<_, String>(8)?),
        scope: parse_json_list(&row.get::<_, String>(9)?),
        requirements: parse_json_list(&row.get::<_, String>(10)?),
        risks: parse_json_list(&row.get::<_, String>(11)?),
        inputs: parse_json_list(&row.get::<_, String>(12)?),
        outputs: parse_json_list(&row.get::<_, String>(13)?),
        files: parse_json_list(&row.get::<_, String>(14)?),
        subtasks: serde_json::from_str::<Vec<Subtask>>(&row.get::<_, String>(15)?)
            .unwrap_or_default(),
        metrics: Vec::new(),
        test_cases: Vec::new(),
        agent_id: row.get(16)?,
        last_edited: row
            .get::<_, Option<String>>(17)?
            .map(|s| parse_timestamp(&s)),
    })
}

fn row_to_project(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        phase: row
            .get::<_, String>(2)?
            .parse::<PipelinePhase>()
            .unwrap_or_default(),
        summary: row.get(3)?,
        problem: row.get(4)?,
        transcript: row.get(5)?,
        work_plan: row.get(6)?,
        questions: parse_json_list(&row.get::<_, String>(7)?),
        refinement_iteration: row.get(8)?,
        created_at: parse_timestamp(&row.get::<_, String>(9)?),
        updated_at: parse_timestamp(&row.get::<_, String>(10)?),
    })
}

fn parse_json_list(text: &str) -> Vec<String> {
    serde_json::from_str(text).unwrap_or_default()
}

fn parse_timestamp(text: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(text)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_check_status(text: &str) -> CheckStatus {
    match text {
        "pass" => CheckStatus::Pass,
        "fail" => CheckStatus::Fail,
        _ => CheckStatus::Pending,
    }
}

fn check_status_str(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pending => "pending",
        CheckStatus::Pass => "pass",
        CheckStatus::Fail => "fail",
    }
}

fn parse_dept(text: &str) -> Dept {
    match text {
        "DISC" => Dept::Disc,
        "DES" => Dept::Des,
        "MGT" => Dept::Mgt,
        _ => Dept::Dev,
    }
}

fn parse_agent_status(text: &str) -> AgentStatus {
    match text {
        "pending" => AgentStatus::Pending,
        "active" => AgentStatus::Active,
        "working" => AgentStatus::Working,
        "complete" => AgentStatus::Complete,
        _ => AgentStatus::Idle,
    }
}

fn parse_log_level(text: &str) -> LogLevel {
    match text {
        "debug" => LogLevel::Debug,
        "warn" => LogLevel::Warn,
        "error" => LogLevel::Error,
        _ => LogLevel::Info,
    }
}

/// Get the storage directory for a workspace.
///
/// Uses a hash of the workspace path to create a unique directory
/// under `~/.local/share/foreman/` (or `$FM_DATA_DIR` when set).
pub fn get_storage_dir(workspace: &Path) -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("FM_DATA_DIR") {
        return Ok(storage_dir_under(Path::new(&dir), workspace));
    }

    let data_dir = dirs::data_dir()
        .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))?;
    Ok(storage_dir_under(&data_dir.join("foreman"), workspace))
}

fn storage_dir_under(data_root: &Path, workspace: &Path) -> PathBuf {
    let canonical = workspace
        .canonicalize()
        .unwrap_or_else(|_| workspace.to_path_buf());

    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string_lossy().as_bytes());
    let hash = hasher.finalize();
    let hash_hex = format!("{:x}", hash);
    data_root.join(&hash_hex[..12])
}

/// Generate a unique ID for a pipeline entity.
///
/// Format: `<prefix>-<4 hex chars>`
/// - Project prefix: "fp"
/// - Manager prefix: "fmgr"
pub fn generate_id(prefix: &str, seed: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(uuid::Uuid::new_v4().as_bytes());
    hasher.update(
        chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or(0)
            .to_le_bytes(),
    );
    let hash = hasher.finalize();
    let hash_hex = format!("{:x}", hash);
    format!("{}-{}", prefix, &hash_hex[..4])
}

/// Validate that an ID matches the expected format.
pub fn validate_id(id: &str, prefix: &str) -> Result<()> {
    if !id.starts_with(&format!("{}-", prefix)) {
        return Err(Error::InvalidId(format!(
            "ID must start with '{}-', got: {}",
            prefix, id
        )));
    }

    let suffix = &id[prefix.len() + 1..];
    if suffix.len() < 4 || !suffix.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::InvalidId(format!(
            "ID suffix must be hex characters, got: {}",
            suffix
        )));
    }

    Ok(())
}
