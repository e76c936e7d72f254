//! Connector entry points: test connection, full and single-record runs.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::client::IscClient;
use crate::config::ConnectorConfig;
use crate::engine::ReconciliationEngine;
use crate::error::{SodError, SodResult};
use crate::policy_config::{PolicyConfig, PolicyType};
use crate::result::PolicyReconciliationResult;

/// The connector: reads policy configuration records from their source
/// and reconciles the tenant to each of them.
pub struct SodConnector {
    config: Arc<ConnectorConfig>,
    client: IscClient,
    source_id: RwLock<Option<String>>,
}

impl SodConnector {
    pub fn new(config: ConnectorConfig) -> SodResult<Self> {
        config.validate()?;
        let client = IscClient::new(&config)?;
        Ok(Self {
            config: Arc::new(config),
            client,
            source_id: RwLock::new(None),
        })
    }

    /// Verifies credentials and that the policy configuration source exists.
    pub async fn test_connection(&self) -> SodResult<()> {
        self.config_source_id().await.map(drop)
    }

    /// Reconciles every SOD-type record on the configuration source.
    ///
    /// Results come back in record order. With parallel processing enabled
    /// each record runs on its own task with a dedicated client, so the
    /// records do not contend for one access token.
    pub async fn reconcile_all(&self) -> SodResult<Vec<PolicyReconciliationResult>> {
        let source_id = self.config_source_id().await?;
        let records = match self.client.list_source_accounts(&source_id).await {
            Ok(records) => records,
            Err(other) => {
                error!(
                    "Error retrieving Policy Configurations from the Policy Config Source using ListAccounts API: {}",
                    other
                );
                return Err(other);
            }
        };
        debug!("Found {} Policy Configurations", records.len());

        // Only SOD-type records are processed.
        let configs: Vec<PolicyConfig> = records
            .iter()
            .map(PolicyConfig::from_record)
            .filter(|config| matches!(config.policy_type, PolicyType::Sod))
            .collect();

        if self.config.parallel_processing {
            let mut handles = Vec::with_capacity(configs.len());
            for config in configs {
                let api = self.session()?;
                let connector_config = Arc::clone(&self.config);
                let policy_name = config.policy_name.clone();
                let handle = tokio::spawn(async move {
                    ReconciliationEngine::new(api, connector_config)
                        .reconcile(&config)
                        .await
                });
                handles.push((policy_name, handle));
            }

            let mut results = Vec::with_capacity(handles.len());
            for (policy_name, handle) in handles {
                match handle.await {
                    Ok(result) => results.push(result),
                    Err(join_error) => {
                        error!(
                            "Reconciliation task for policy [{}] failed: {}",
                            policy_name, join_error
                        );
                        let mut result = PolicyReconciliationResult::new(&policy_name);
                        result
                            .error_messages
                            .push(format!("Reconciliation task failed: {join_error}"));
                        results.push(result);
                    }
                }
            }
            info!("Reconciled {} policies", results.len());
            Ok(results)
        } else {
            let engine = ReconciliationEngine::new(self.session()?, Arc::clone(&self.config));
            let mut results = Vec::with_capacity(configs.len());
            for config in configs {
                results.push(engine.reconcile(&config).await);
            }
            info!("Reconciled {} policies", results.len());
            Ok(results)
        }
    }

    /// Reconciles the single record with the given policy name, or `None`
    /// when the source has no such record or it is not an SOD policy.
    pub async fn reconcile_by_name(
        &self,
        policy_name: &str,
    ) -> SodResult<Option<PolicyReconciliationResult>> {
        let source_id = self.config_source_id().await?;
        let record = match self
            .client
            .find_source_account(&source_id, policy_name)
            .await
        {
            Ok(record) => record,
            Err(other) => {
                error!(
                    "Error retrieving single Policy Configuration from the Policy Config Source using ListAccounts API: {}",
                    other
                );
                return Err(other);
            }
        };
        let Some(record) = record else {
            debug!("No Policy Configuration found by name [{}]", policy_name);
            return Ok(None);
        };

        let config = PolicyConfig::from_record(&record);
        if !matches!(config.policy_type, PolicyType::Sod) {
            return Ok(None);
        }

        let engine = ReconciliationEngine::new(self.session()?, Arc::clone(&self.config));
        Ok(Some(engine.reconcile(&config).await))
    }

    /// The client one record's worth of work runs on: a dedicated client
    /// with its own token in parallel mode, the shared one otherwise.
    fn session(&self) -> SodResult<IscClient> {
        if self.config.parallel_processing {
            IscClient::new(&self.config)
        } else {
            Ok(self.client.clone())
        }
    }

    /// Resolves and caches the id of the policy configuration source.
    async fn config_source_id(&self) -> SodResult<String> {
        if let Some(id) = self.source_id.read().await.clone() {
            return Ok(id);
        }

        let mut cached = self.source_id.write().await;
        if let Some(id) = cached.clone() {
            return Ok(id);
        }

        debug!("Policy Config Source ID not set, getting the ID using the Sources API");
        let found = match self
            .client
            .find_source_by_name(&self.config.policy_config_source_name)
            .await
        {
            Ok(found) => found,
            Err(other) => {
                error!(
                    "Error retrieving Policy Configurations Source ID using Sources API: {}",
                    other
                );
                return Err(other);
            }
        };
        match found {
            Some(id) => {
                debug!("Policy Config Source Id: [{}]", id);
                *cached = Some(id.clone());
                Ok(id)
            }
            None => Err(SodError::Config(
                "Unable to retrieve the Policy Configuration Source ID using the Provided Source Name"
                    .to_string(),
            )),
        }
    }
}
