use std::env;
use std::path::PathBuf;

/// Access tier of a reference collection. Private collections are only
/// readable in deployed environments that hold the elevated-access flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessControl {
    Public,
    Private,
}

/// Where the process is running. Local and test environments never see
/// private reference collections, whatever the access flag says.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuntimeMode {
    #[default]
    Local,
    Test,
    Deployed,
}

/// Process-wide configuration, built once at startup and threaded
/// explicitly through the pipeline. Never read from the environment
/// after construction.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub mode: RuntimeMode,
    pub access_private_datasets: bool,
    pub reference_datasets_root: PathBuf,
    pub private_reference_datasets_root: PathBuf,
    pub annotation_tables_root: PathBuf,
    pub loading_datasets_root: PathBuf,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            mode: RuntimeMode::Local,
            access_private_datasets: false,
            reference_datasets_root: PathBuf::from("/reference-datasets"),
            private_reference_datasets_root: PathBuf::from("/reference-datasets-private"),
            annotation_tables_root: PathBuf::from("/annotation-tables"),
            loading_datasets_root: PathBuf::from("/loading-datasets"),
        }
    }
}

impl EnvConfig {
    /// Read configuration from process environment variables, falling back
    /// to the defaults above for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            mode: match env::var("VAT_RUNTIME_MODE").as_deref() {
                Ok("deployed") => RuntimeMode::Deployed,
                Ok("test") => RuntimeMode::Test,
                _ => RuntimeMode::Local,
            },
            access_private_datasets: env::var("VAT_ACCESS_PRIVATE_DATASETS").as_deref() == Ok("1"),
            reference_datasets_root: path_var("VAT_REFERENCE_DATASETS", defaults.reference_datasets_root),
            private_reference_datasets_root: path_var(
                "VAT_PRIVATE_REFERENCE_DATASETS",
                defaults.private_reference_datasets_root,
            ),
            annotation_tables_root: path_var("VAT_ANNOTATION_TABLES", defaults.annotation_tables_root),
            loading_datasets_root: path_var("VAT_LOADING_DATASETS", defaults.loading_datasets_root),
        }
    }

    /// Whether collections at the given tier are visible to this process.
    pub fn allows(&self, access: AccessControl) -> bool {
        match access {
            AccessControl::Public => true,
            AccessControl::Private => {
                self.mode == RuntimeMode::Deployed && self.access_private_datasets
            }
        }
    }
}

fn path_var(name: &str, default: PathBuf) -> PathBuf {
    env::var(name).map(PathBuf::from).unwrap_or(default)
}
