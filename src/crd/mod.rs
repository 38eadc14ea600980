//! Kubernetes distribution metadata kinds
//!
//! One object per catalog entry per kind, all stored in the global namespace:
//! - RkeK8sSystemImage: system images for a Kubernetes version
//! - RkeK8sWindowsSystemImage: Windows system images for a Kubernetes version
//! - RkeK8sServiceOption: kubelet/apiserver/... options (Linux and Windows)
//! - RkeAddon: a rendered addon template for one addon and Kubernetes version
//!
//! These kinds are owned by the management plane, which keeps the payload as
//! a top-level field next to `metadata` instead of under `spec`. They
//! implement [`kube::Resource`] by hand so the wire shape matches.

/// Implements [`kube::Resource`] for a namespaced `management.cattle.io/v3` kind
macro_rules! management_resource {
    ($ty:ident, $kind:literal, $plural:literal) => {
        impl kube::Resource for $ty {
            type DynamicType = ();
            type Scope = k8s_openapi::NamespaceResourceScope;

            fn kind(_: &()) -> std::borrow::Cow<'_, str> {
                $kind.into()
            }

            fn group(_: &()) -> std::borrow::Cow<'_, str> {
                $crate::crd::API_GROUP.into()
            }

            fn version(_: &()) -> std::borrow::Cow<'_, str> {
                $crate::crd::API_GROUP_VERSION.into()
            }

            fn api_version(_: &()) -> std::borrow::Cow<'_, str> {
                $crate::crd::API_VERSION.into()
            }

            fn plural(_: &()) -> std::borrow::Cow<'_, str> {
                $plural.into()
            }

            fn meta(&self) -> &k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta {
                &self.metadata
            }

            fn meta_mut(&mut self) -> &mut k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta {
                &mut self.metadata
            }
        }
    };
}

mod addon;
mod service_option;
mod system_image;

pub use addon::RkeAddon;
pub use service_option::{KubernetesServicesOptions, RkeK8sServiceOption};
pub use system_image::{RkeK8sSystemImage, RkeK8sWindowsSystemImage, SystemImages};

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// API group of every metadata kind
pub const API_GROUP: &str = "management.cattle.io";
pub const API_GROUP_VERSION: &str = "v3";
/// `apiVersion` of every metadata kind
pub const API_VERSION: &str = "management.cattle.io/v3";
/// Namespace holding every object this operator produces
pub const GLOBAL_NAMESPACE: &str = "cattle-global-data";

/// Marks objects whose Kubernetes version ships in the vendor default catalog
pub const PROVENANCE_LABEL: &str = "io.cattle.rke_store";
pub const PROVENANCE_LABEL_VALUE: &str = "false";

/// Object name of a Windows variant, kept apart from the Linux object of the same version
pub fn windows_name(k8s_version: &str) -> String {
    format!("w{}", k8s_version)
}

/// Object name of an addon template; one addon spans many per-version templates
pub fn addon_name(addon: &str, k8s_version: &str) -> String {
    format!("{}-{}", addon.to_lowercase(), k8s_version)
}

fn named(name: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::Resource;

    #[test]
    fn test_windows_name() {
        assert_eq!(windows_name("v1.18.9"), "wv1.18.9");
        assert_ne!(windows_name("v1.18.9"), "v1.18.9");
    }

    #[test]
    fn test_addon_name_lowercases_addon() {
        assert_eq!(addon_name("Cleanup", "v1.18.9"), "cleanup-v1.18.9");
        assert_eq!(
            addon_name("nginxIngress", "v1.20.4-rancher1-1"),
            "nginxingress-v1.20.4-rancher1-1"
        );
    }

    #[test]
    fn test_resource_paths() {
        assert_eq!(RkeK8sSystemImage::api_version(&()), "management.cattle.io/v3");
        assert_eq!(
            RkeK8sSystemImage::url_path(&(), Some(GLOBAL_NAMESPACE)),
            "/apis/management.cattle.io/v3/namespaces/cattle-global-data/rkek8ssystemimages"
        );
        assert_eq!(RkeK8sWindowsSystemImage::plural(&()), "rkek8swindowssystemimages");
        assert_eq!(RkeK8sServiceOption::plural(&()), "rkek8sserviceoptions");
        assert_eq!(RkeAddon::kind(&()), "RkeAddon");
        assert_eq!(RkeAddon::plural(&()), "rkeaddons");
    }
}
