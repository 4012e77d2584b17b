//! Chat responder.
//!
//! Classifies the message into a topic by keyword matching on the lower-cased
//! text, then answers from role/project-scoped repository reads. Greetings,
//! help, and thanks get canned responses; anything else is echoed back with a
//! prompt to be more specific. No model call is involved.

use std::sync::Arc;

use carbonledger_core::models::IncidentStatus;
use carbonledger_core::{AppError, ProjectScope, Role};
use carbonledger_db::ChatStore;
use uuid::Uuid;

/// Who is asking, and which projects they may see.
#[derive(Debug, Clone)]
pub struct ChatContext {
    pub user_id: Uuid,
    pub role: Role,
    pub user_projects: Vec<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Topic {
    Incident,
    BusinessUnit,
    Project,
    General,
}

/// Keyword classification. Incident keywords win over business-unit keywords,
/// which win over project keywords, so "incident in project X" reads as an
/// incident question.
fn classify(lowered: &str) -> Topic {
    if lowered.contains("incident") {
        Topic::Incident
    } else if lowered.contains("business unit") || lowered.contains("business_unit") {
        Topic::BusinessUnit
    } else if lowered.contains("project") {
        Topic::Project
    } else {
        Topic::General
    }
}

fn is_greeting(lowered: &str) -> bool {
    ["hello", "hi ", "hey"]
        .iter()
        .any(|g| lowered.starts_with(g))
        || lowered == "hi"
}

#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn ChatStore>,
}

impl ChatService {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self { store }
    }

    pub async fn respond(&self, message: &str, ctx: &ChatContext) -> Result<String, AppError> {
        let lowered = message.trim().to_lowercase();
        if lowered.is_empty() {
            return Err(AppError::InvalidInput("Message is required".to_string()));
        }

        if is_greeting(&lowered) {
            return Ok(
                "Hello! I can answer questions about your projects, business units, \
                 and incidents. What would you like to know?"
                    .to_string(),
            );
        }
        if lowered.contains("thank") {
            return Ok("You're welcome! Let me know if there is anything else.".to_string());
        }
        if lowered.contains("help") {
            return Ok(
                "Try asking about your projects (\"how are my projects doing?\"), \
                 business units, or incidents (\"any open incidents?\")."
                    .to_string(),
            );
        }

        // Organization-wide admins see everything; everyone else only the
        // projects in their explicit membership set.
        let scope = ProjectScope::for_user(ctx.role, ctx.user_projects.clone());
        let filter = scope.as_filter().map(|ids| ids.to_vec());

        match classify(&lowered) {
            Topic::Incident => self.answer_incidents(ctx.user_id, filter).await,
            Topic::BusinessUnit => self.answer_business_units(ctx.user_id, filter).await,
            Topic::Project => self.answer_projects(ctx.user_id, filter).await,
            Topic::General => Ok(format!(
                "I'm not sure how to help with \"{}\". Could you be more specific? \
                 I can answer questions about projects, business units, and incidents.",
                message.trim()
            )),
        }
    }

    async fn answer_projects(
        &self,
        user_id: Uuid,
        filter: Option<Vec<Uuid>>,
    ) -> Result<String, AppError> {
        let projects = self.store.projects_for_user(user_id, filter).await?;
        if projects.is_empty() {
            return Ok(
                "You don't have any projects yet. Create one from the dashboard to \
                 start tracking emissions."
                    .to_string(),
            );
        }
        let total: rust_decimal::Decimal =
            projects.iter().map(|p| p.emissions_data.total()).sum();
        let names: Vec<&str> = projects.iter().take(5).map(|p| p.name.as_str()).collect();
        Ok(format!(
            "You have {} project(s): {}. Tracked emissions across them total {} tCO2e.",
            projects.len(),
            names.join(", "),
            total
        ))
    }

    async fn answer_business_units(
        &self,
        user_id: Uuid,
        filter: Option<Vec<Uuid>>,
    ) -> Result<String, AppError> {
        let units = self.store.business_units_for_user(user_id, filter).await?;
        if units.is_empty() {
            return Ok("No business units are visible to you yet.".to_string());
        }
        let names: Vec<&str> = units.iter().take(5).map(|u| u.name.as_str()).collect();
        Ok(format!(
            "You have {} business unit(s): {}.",
            units.len(),
            names.join(", ")
        ))
    }

    async fn answer_incidents(
        &self,
        user_id: Uuid,
        filter: Option<Vec<Uuid>>,
    ) -> Result<String, AppError> {
        let incidents = self.store.incidents_for_user(user_id, filter).await?;
        if incidents.is_empty() {
            return Ok("There are no incidents in your projects. All clear!".to_string());
        }
        let open = incidents
            .iter()
            .filter(|i| {
                matches!(
                    i.status,
                    IncidentStatus::Open | IncidentStatus::InProgress
                )
            })
            .count();
        let latest: Vec<&str> = incidents.iter().take(3).map(|i| i.title.as_str()).collect();
        Ok(format!(
            "Your projects have {} incident(s), {} of them open or in progress. \
             Most recent: {}.",
            incidents.len(),
            open,
            latest.join("; ")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use carbonledger_core::models::{
        EmissionsData, Incident, IncidentSeverity, Project, ProjectStatus, ProjectType,
    };
    use chrono::Utc;
    use std::sync::Mutex;

    /// Fake store that records the filter it was queried with, so tests can
    /// assert scoping behavior.
    #[derive(Default)]
    struct RecordingStore {
        last_filter: Mutex<Option<Option<Vec<Uuid>>>>,
        incidents: Vec<Incident>,
        projects: Vec<Project>,
    }

    impl RecordingStore {
        fn seen_filter(&self) -> Option<Option<Vec<Uuid>>> {
            self.last_filter.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatStore for RecordingStore {
        async fn projects_for_user(
            &self,
            _user_id: Uuid,
            project_filter: Option<Vec<Uuid>>,
        ) -> Result<Vec<Project>, AppError> {
            let filtered = filter_projects(&self.projects, &project_filter);
            *self.last_filter.lock().unwrap() = Some(project_filter);
            Ok(filtered)
        }

        async fn business_units_for_user(
            &self,
            _user_id: Uuid,
            project_filter: Option<Vec<Uuid>>,
        ) -> Result<Vec<Project>, AppError> {
            *self.last_filter.lock().unwrap() = Some(project_filter);
            Ok(vec![])
        }

        async fn incidents_for_user(
            &self,
            _user_id: Uuid,
            project_filter: Option<Vec<Uuid>>,
        ) -> Result<Vec<Incident>, AppError> {
            let filtered = self
                .incidents
                .iter()
                .filter(|i| match &project_filter {
                    None => true,
                    Some(ids) => ids.contains(&i.project_id),
                })
                .cloned()
                .collect();
            *self.last_filter.lock().unwrap() = Some(project_filter);
            Ok(filtered)
        }
    }

    fn filter_projects(projects: &[Project], filter: &Option<Vec<Uuid>>) -> Vec<Project> {
        projects
            .iter()
            .filter(|p| match filter {
                None => true,
                Some(ids) => ids.contains(&p.id),
            })
            .cloned()
            .collect()
    }

    fn project(id: Uuid, name: &str) -> Project {
        Project {
            id,
            organization_id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            project_type: ProjectType::Project,
            code: None,
            status: ProjectStatus::Active,
            location: None,
            parent_id: None,
            emissions_data: EmissionsData::default(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            created_by: Uuid::new_v4(),
            updated_by: Uuid::new_v4(),
        }
    }

    fn incident(project_id: Uuid, title: &str) -> Incident {
        Incident {
            id: Uuid::new_v4(),
            project_id,
            organization_id: Uuid::new_v4(),
            incident_type_id: None,
            title: title.to_string(),
            description: None,
            severity: IncidentSeverity::High,
            status: IncidentStatus::Open,
            location: None,
            reported_at: Utc::now(),
            resolved_at: None,
            closed_at: None,
            assigned_to: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn ctx(role: Role, projects: Vec<Uuid>) -> ChatContext {
        ChatContext {
            user_id: Uuid::new_v4(),
            role,
            user_projects: projects,
        }
    }

    #[tokio::test]
    async fn test_greeting_gets_canned_response() {
        let svc = ChatService::new(Arc::new(RecordingStore::default()));
        let reply = svc
            .respond("Hello there", &ctx(Role::Member, vec![]))
            .await
            .unwrap();
        assert!(reply.contains("Hello"));
    }

    #[tokio::test]
    async fn test_unclassified_message_echoes_back() {
        let svc = ChatService::new(Arc::new(RecordingStore::default()));
        let reply = svc
            .respond("what is the weather", &ctx(Role::Member, vec![]))
            .await
            .unwrap();
        assert!(reply.contains("what is the weather"));
        assert!(reply.contains("more specific"));
    }

    #[tokio::test]
    async fn test_incident_answer_scoped_to_user_projects() {
        let mine = Uuid::new_v4();
        let other = Uuid::new_v4();
        let store = Arc::new(RecordingStore {
            incidents: vec![
                incident(mine, "Fuel spill at depot"),
                incident(other, "Confidential outage"),
            ],
            ..Default::default()
        });
        let svc = ChatService::new(store.clone());

        let reply = svc
            .respond("any incidents?", &ctx(Role::Member, vec![mine]))
            .await
            .unwrap();

        // Non-admin: the store must have been queried with the explicit
        // project set, and the answer must not leak the other project's
        // incident.
        assert_eq!(store.seen_filter(), Some(Some(vec![mine])));
        assert!(reply.contains("Fuel spill at depot"));
        assert!(!reply.contains("Confidential outage"));
    }

    #[tokio::test]
    async fn test_admin_incident_query_is_unrestricted() {
        let store = Arc::new(RecordingStore::default());
        let svc = ChatService::new(store.clone());

        svc.respond("any incidents?", &ctx(Role::Admin, vec![Uuid::new_v4()]))
            .await
            .unwrap();

        assert_eq!(store.seen_filter(), Some(None));
    }

    #[tokio::test]
    async fn test_incident_keyword_wins_over_project() {
        let pid = Uuid::new_v4();
        let store = Arc::new(RecordingStore {
            incidents: vec![incident(pid, "Leak")],
            projects: vec![project(pid, "Plant A")],
            ..Default::default()
        });
        let svc = ChatService::new(store);
        let reply = svc
            .respond(
                "show incidents in my project",
                &ctx(Role::Member, vec![pid]),
            )
            .await
            .unwrap();
        assert!(reply.contains("incident"));
        assert!(reply.contains("Leak"));
    }

    #[tokio::test]
    async fn test_project_answer_lists_names() {
        let pid = Uuid::new_v4();
        let store = Arc::new(RecordingStore {
            projects: vec![project(pid, "Plant A")],
            ..Default::default()
        });
        let svc = ChatService::new(store);
        let reply = svc
            .respond("how are my projects doing", &ctx(Role::Member, vec![pid]))
            .await
            .unwrap();
        assert!(reply.contains("Plant A"));
    }

    #[tokio::test]
    async fn test_empty_message_is_invalid() {
        let svc = ChatService::new(Arc::new(RecordingStore::default()));
        let err = svc
            .respond("   ", &ctx(Role::Member, vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
