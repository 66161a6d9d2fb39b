use clap::Args;

pub const DEFAULT_CLUSTER_DOMAIN: &str = "cluster.local";
pub const DEFAULT_CONTROLLER_NAME: &str = "knative-sources-controller";

/// Settings shared by every Source reconciler.
///
/// Meant to be flattened into the CLI of a controller binary.
#[derive(Debug, Args, Clone, PartialEq)]
pub struct ReconcilerOptions {
    /// DNS suffix of Services in the cluster, used to address Services referenced as sinks.
    #[arg(long, env = "CLUSTER_DOMAIN", default_value = DEFAULT_CLUSTER_DOMAIN)]
    pub cluster_domain: String,

    /// Reported as the source of Events and in the `app.kubernetes.io/managed-by` label.
    #[arg(long, env = "CONTROLLER_NAME", default_value = DEFAULT_CONTROLLER_NAME)]
    pub controller_name: String,
}

impl Default for ReconcilerOptions {
    fn default() -> Self {
        ReconcilerOptions {
            cluster_domain: DEFAULT_CLUSTER_DOMAIN.to_string(),
            controller_name: DEFAULT_CONTROLLER_NAME.to_string(),
        }
    }
}

/// Container images of the adapters, one per Source kind.
#[derive(Debug, Args, Clone, PartialEq)]
pub struct AdapterImages {
    #[arg(long = "awssqssource-adapter-image", env = "AWSSQSSOURCE_ADAPTER_IMAGE")]
    pub awssqssource: String,

    #[arg(long = "awssnssource-adapter-image", env = "AWSSNSSOURCE_ADAPTER_IMAGE")]
    pub awssnssource: String,
}
