use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use serde_json::Value;

use crate::config::ScriptingConfig;
use crate::workflows::registration::calendar::Period;
use crate::workflows::registration::directory::{
    EmployeeDirectory, EmployeeRecord, ProfileLookup, SavedEmployee,
};
use crate::workflows::registration::domain::{CodeDescription, EmployeeSubmission, STATUS_OK};
use crate::workflows::registration::notification::{
    ArtifactRenderer, Flow, NotificationDispatch, NotificationJob, NotificationOrchestrator,
    NotificationPlan, NotificationServices, Notifier, NotifyError, RenderError,
};
use crate::workflows::registration::parameters::ParameterSource;
use crate::workflows::registration::remote::{
    ComputedFields, RegistrationClient, RegistrationRequest, RegistrationResponse, RemoteError,
};
use crate::workflows::registration::rules::{RuleDefinition, RuleStore};
use crate::workflows::registration::scripting::{ReadQueries, Row, ScriptEngine};
use crate::workflows::registration::storage::{BlobError, BlobStore, StoreError};
use crate::workflows::registration::validation::ValidationOrchestrator;

pub(super) fn rule(id: &str, body: &str) -> RuleDefinition {
    RuleDefinition::new(id, body)
}

pub(super) fn submission() -> EmployeeSubmission {
    EmployeeSubmission {
        names: "Ana".to_string(),
        last_names: "Rivera".to_string(),
        document_type: "ID".to_string(),
        document_number: "1020304050".to_string(),
        date_of_birth: "1995-08-21".to_string(),
        date_affiliation_company: "2020-02-01".to_string(),
        position: "DEV".to_string(),
        email: Some("ana.rivera@example.com".to_string()),
        salary: "4200".to_string(),
    }
}

pub(super) fn engine_with(queries: Arc<dyn ReadQueries>) -> Arc<ScriptEngine> {
    Arc::new(ScriptEngine::new(queries, ScriptingConfig::default()))
}

pub(super) fn engine() -> Arc<ScriptEngine> {
    engine_with(Arc::new(CountingQueries::default()))
}

pub(super) fn validator(rules: Vec<RuleDefinition>) -> ValidationOrchestrator {
    ValidationOrchestrator::new(Arc::new(MemoryRules::with_validation(rules)), engine())
}

#[derive(Default)]
pub(super) struct MemoryRules {
    validation: Vec<RuleDefinition>,
    by_id: HashMap<String, RuleDefinition>,
}

impl MemoryRules {
    pub(super) fn with_validation(rules: Vec<RuleDefinition>) -> Self {
        Self {
            validation: rules,
            by_id: HashMap::new(),
        }
    }

    pub(super) fn with_rule(mut self, rule: RuleDefinition) -> Self {
        self.by_id.insert(rule.id.clone(), rule);
        self
    }
}

impl RuleStore for MemoryRules {
    fn active_rules(&self, rule_set: &str) -> Result<Vec<RuleDefinition>, StoreError> {
        match rule_set {
            "validation" => Ok(self.validation.clone()),
            _ => Ok(Vec::new()),
        }
    }

    fn find_active(&self, id: &str) -> Result<Option<RuleDefinition>, StoreError> {
        Ok(self.by_id.get(id).cloned())
    }
}

pub(super) struct UnavailableRules;

impl RuleStore for UnavailableRules {
    fn active_rules(&self, _rule_set: &str) -> Result<Vec<RuleDefinition>, StoreError> {
        Err(StoreError::LockPoisoned)
    }

    fn find_active(&self, _id: &str) -> Result<Option<RuleDefinition>, StoreError> {
        Err(StoreError::LockPoisoned)
    }
}

#[derive(Default)]
pub(super) struct MemoryParameters {
    values: Mutex<HashMap<String, String>>,
    reads: AtomicUsize,
}

impl MemoryParameters {
    pub(super) fn with(entries: &[(&str, &str)]) -> Self {
        let values = entries
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        Self {
            values: Mutex::new(values),
            reads: AtomicUsize::new(0),
        }
    }

    pub(super) fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl ParameterSource for MemoryParameters {
    fn get_many(&self, names: &[&str]) -> Result<HashMap<String, String>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let guard = self.values.lock().expect("parameter mutex poisoned");
        Ok(names
            .iter()
            .filter_map(|name| guard.get(*name).map(|value| (name.to_string(), value.clone())))
            .collect())
    }

    fn get_one(&self, name: &str) -> Result<Option<String>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let guard = self.values.lock().expect("parameter mutex poisoned");
        Ok(guard.get(name).cloned())
    }
}

/// Query capability that counts calls and answers every statement with the same rows.
#[derive(Default)]
pub(super) struct CountingQueries {
    pub(super) rows: Vec<Row>,
    calls: Mutex<Vec<(String, Vec<Value>)>>,
}

impl CountingQueries {
    pub(super) fn returning(rows: Vec<Row>) -> Self {
        Self {
            rows,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.calls.lock().expect("query mutex poisoned").clone()
    }
}

impl ReadQueries for CountingQueries {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>, StoreError> {
        self.calls
            .lock()
            .expect("query mutex poisoned")
            .push((sql.to_string(), params.to_vec()));
        Ok(self.rows.clone())
    }
}

pub(super) struct FailingQueries;

impl ReadQueries for FailingQueries {
    fn query(&self, sql: &str, _params: &[Value]) -> Result<Vec<Row>, StoreError> {
        Err(StoreError::WriteRejected(sql.to_string()))
    }
}

#[derive(Default)]
pub(super) struct RecordingNotifier {
    sent: Mutex<Vec<NotificationPlan>>,
}

impl RecordingNotifier {
    pub(super) fn sent(&self) -> Vec<NotificationPlan> {
        self.sent.lock().expect("notifier mutex poisoned").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, plan: &NotificationPlan) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .expect("notifier mutex poisoned")
            .push(plan.clone());
        Ok(())
    }
}

pub(super) struct OfflineNotifier;

impl Notifier for OfflineNotifier {
    fn send(&self, _plan: &NotificationPlan) -> Result<(), NotifyError> {
        Err(NotifyError::Transport("smtp offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct RecordingDispatch {
    jobs: Mutex<Vec<NotificationJob>>,
}

impl RecordingDispatch {
    pub(super) fn jobs(&self) -> Vec<NotificationJob> {
        self.jobs.lock().expect("dispatch mutex poisoned").clone()
    }
}

impl NotificationDispatch for RecordingDispatch {
    fn enqueue(&self, job: NotificationJob) {
        self.jobs.lock().expect("dispatch mutex poisoned").push(job);
    }
}

pub(super) struct StubRegistration {
    response: RegistrationResponse,
    calls: Mutex<Vec<(RegistrationRequest, String)>>,
}

impl StubRegistration {
    pub(super) fn answering(response: RegistrationResponse) -> Self {
        Self {
            response,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn saved(updated: bool) -> Self {
        Self::answering(RegistrationResponse {
            status_code: STATUS_OK,
            status_message: "Saved".to_string(),
            updated,
            computed: ComputedFields {
                tenure: Period {
                    years: 6,
                    months: 8,
                    days: 18,
                },
                age: Period {
                    years: 31,
                    months: 1,
                    days: 28,
                },
                type_document_description: Some("National identity card".to_string()),
                position_description: Some("Software developer".to_string()),
            },
        })
    }

    pub(super) fn calls(&self) -> Vec<(RegistrationRequest, String)> {
        self.calls.lock().expect("registration mutex poisoned").clone()
    }
}

impl RegistrationClient for StubRegistration {
    fn register(
        &self,
        request: &RegistrationRequest,
        caller_token: &str,
    ) -> Result<RegistrationResponse, RemoteError> {
        self.calls
            .lock()
            .expect("registration mutex poisoned")
            .push((request.clone(), caller_token.to_string()));
        Ok(self.response.clone())
    }
}

pub(super) struct UnreachableRegistration;

impl RegistrationClient for UnreachableRegistration {
    fn register(
        &self,
        _request: &RegistrationRequest,
        _caller_token: &str,
    ) -> Result<RegistrationResponse, RemoteError> {
        Err(RemoteError::Transport("connection refused".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryBlobs {
    stored: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobs {
    pub(super) fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .stored
            .lock()
            .expect("blob mutex poisoned")
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

impl BlobStore for MemoryBlobs {
    fn store(&self, bytes: &[u8], suggested_name: &str) -> Result<String, BlobError> {
        let key = format!("reports/{suggested_name}");
        self.stored
            .lock()
            .expect("blob mutex poisoned")
            .insert(key.clone(), bytes.to_vec());
        Ok(key)
    }

    fn fetch(&self, key: &str) -> Result<Vec<u8>, BlobError> {
        self.stored
            .lock()
            .expect("blob mutex poisoned")
            .get(key)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(key.to_string()))
    }
}

pub(super) fn employee_record(id: i64, report_location: Option<&str>) -> EmployeeRecord {
    EmployeeRecord {
        id,
        names: "Ana".to_string(),
        last_names: "Rivera".to_string(),
        document_type: CodeDescription {
            code: "ID".to_string(),
            description: Some("National identity card".to_string()),
        },
        document_number: "1020304050".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1995, 8, 21).expect("valid date"),
        date_affiliation_company: NaiveDate::from_ymd_opt(2020, 2, 1).expect("valid date"),
        position: CodeDescription {
            code: "DEV".to_string(),
            description: Some("Software developer".to_string()),
        },
        salary: "4200".to_string(),
        report_location: report_location.map(str::to_string),
    }
}

#[derive(Default)]
pub(super) struct MemoryDirectory {
    records: Mutex<Vec<EmployeeRecord>>,
    reports: Mutex<Vec<(String, String, String)>>,
}

impl MemoryDirectory {
    pub(super) fn holding(records: Vec<EmployeeRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            reports: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn reports(&self) -> Vec<(String, String, String)> {
        self.reports.lock().expect("directory mutex poisoned").clone()
    }
}

impl EmployeeDirectory for MemoryDirectory {
    fn find(&self, lookup: &ProfileLookup) -> Result<Option<EmployeeRecord>, StoreError> {
        let guard = self.records.lock().expect("directory mutex poisoned");
        Ok(guard
            .iter()
            .find(|record| match (&lookup.id, &lookup.document_number) {
                (Some(id), _) => record.id == *id,
                (None, Some(number)) => record.document_number == *number,
                (None, None) => false,
            })
            .cloned())
    }

    fn save(&self, _request: &RegistrationRequest) -> Result<SavedEmployee, StoreError> {
        Err(StoreError::InvalidRecord("read only directory".to_string()))
    }

    fn record_report(
        &self,
        document_type: &str,
        document_number: &str,
        location: &str,
    ) -> Result<(), StoreError> {
        self.reports.lock().expect("directory mutex poisoned").push((
            document_type.to_string(),
            document_number.to_string(),
            location.to_string(),
        ));
        Ok(())
    }
}

#[derive(Default)]
pub(super) struct StaticRenderer {
    renders: AtomicUsize,
}

impl StaticRenderer {
    pub(super) fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

impl ArtifactRenderer for StaticRenderer {
    fn render(&self, submission: &EmployeeSubmission, flow: Flow) -> Result<Vec<u8>, RenderError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{}:{}", flow.label(), submission.document_number).into_bytes())
    }
}

/// Notification orchestrator over in-memory collaborators.
pub(super) struct NotificationHarness {
    pub(super) orchestrator: NotificationOrchestrator,
    pub(super) parameters: Arc<MemoryParameters>,
    pub(super) notifier: Arc<RecordingNotifier>,
    pub(super) blobs: Arc<MemoryBlobs>,
    pub(super) directory: Arc<MemoryDirectory>,
    pub(super) renderer: Arc<StaticRenderer>,
}

pub(super) fn notification_harness(
    parameters: &[(&str, &str)],
    rules: MemoryRules,
) -> NotificationHarness {
    let parameters = Arc::new(MemoryParameters::with(parameters));
    let notifier = Arc::new(RecordingNotifier::default());
    let blobs = Arc::new(MemoryBlobs::default());
    let directory = Arc::new(MemoryDirectory::default());
    let renderer = Arc::new(StaticRenderer::default());
    let orchestrator = NotificationOrchestrator::new(
        parameters.clone(),
        Arc::new(rules),
        engine(),
        NotificationServices {
            renderer: renderer.clone(),
            blobs: blobs.clone(),
            directory: directory.clone(),
            notifier: notifier.clone(),
        },
    );
    NotificationHarness {
        orchestrator,
        parameters,
        notifier,
        blobs,
        directory,
        renderer,
    }
}
