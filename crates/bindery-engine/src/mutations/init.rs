//! Package initialization: the deterministic skeleton.

use crate::context::{context_config_map_yaml, PackageConfig};
use crate::mutation::Mutation;
use crate::EngineError;
use bindery_repository::{CancelToken, PackageResources};
use bindery_schema::{
    InitTaskSpec, PackageInfo, PackageName, Packfile, Task, PACKAGE_CONTEXT_FILE, PACKFILE_NAME,
};

pub(crate) struct InitPackageMutation {
    package_name: PackageName,
    spec: InitTaskSpec,
    config: PackageConfig,
    task: Task,
}

impl InitPackageMutation {
    pub fn new(package_name: PackageName, spec: InitTaskSpec, config: PackageConfig) -> Self {
        let task = Task::Init(spec.clone());
        Self {
            package_name,
            spec,
            config,
            task,
        }
    }
}

impl Mutation for InitPackageMutation {
    fn apply(
        &self,
        cancel: &CancelToken,
        mut resources: PackageResources,
    ) -> Result<(PackageResources, Task), EngineError> {
        cancel.check()?;

        let (name, prefix) = if self.spec.subpackage.is_empty() {
            (self.package_name.as_str(), String::new())
        } else {
            (self.spec.subpackage.as_str(), format!("{}/", self.spec.subpackage))
        };

        let mut packfile = Packfile::new(name);
        if !self.spec.description.is_empty() {
            packfile.info = Some(PackageInfo {
                description: self.spec.description.clone(),
                readiness_gates: Vec::new(),
            });
        }
        resources.insert(format!("{prefix}{PACKFILE_NAME}"), packfile.to_yaml()?);
        resources.insert(
            format!("{prefix}README.md"),
            format!("# {name}\n\n{}\n", self.spec.description),
        );
        resources.insert(
            format!("{prefix}{PACKAGE_CONTEXT_FILE}"),
            context_config_map_yaml(name, &self.config.ancestor_path),
        );

        Ok((resources, self.task.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bindery_schema::{parse_packfile_str, PACKAGE_CONTEXT_NAME};

    fn apply(spec: InitTaskSpec, config: PackageConfig) -> PackageResources {
        let mutation = InitPackageMutation::new("net".into(), spec, config);
        let (resources, task) = mutation
            .apply(&CancelToken::new(), PackageResources::new())
            .unwrap();
        assert!(task.is_init());
        resources
    }

    #[test]
    fn skeleton_is_well_formed() {
        let resources = apply(
            InitTaskSpec {
                subpackage: String::new(),
                description: "network blueprint".to_owned(),
            },
            PackageConfig::default(),
        );

        let packfile = parse_packfile_str(resources.get(PACKFILE_NAME).unwrap()).unwrap();
        assert_eq!(packfile.metadata.name, "net");
        assert_eq!(packfile.info.unwrap().description, "network blueprint");
        assert!(resources.get("README.md").unwrap().contains("network blueprint"));
        assert!(resources
            .get(PACKAGE_CONTEXT_FILE)
            .unwrap()
            .contains(PACKAGE_CONTEXT_NAME));
    }

    #[test]
    fn skeleton_is_deterministic() {
        let spec = InitTaskSpec {
            subpackage: String::new(),
            description: "d".to_owned(),
        };
        let a = apply(spec.clone(), PackageConfig::default());
        let b = apply(spec, PackageConfig::default());
        assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn subpackage_renders_under_prefix() {
        let resources = apply(
            InitTaskSpec {
                subpackage: "db".to_owned(),
                description: String::new(),
            },
            PackageConfig::default(),
        );
        assert!(resources.get(&format!("db/{PACKFILE_NAME}")).is_some());
        let packfile = parse_packfile_str(resources.get(&format!("db/{PACKFILE_NAME}")).unwrap()).unwrap();
        assert_eq!(packfile.metadata.name, "db");
        assert!(packfile.info.is_none());
    }

    #[test]
    fn ancestor_path_lands_in_context() {
        let resources = apply(
            InitTaskSpec::default(),
            PackageConfig {
                package_path: "foo/bar/net".to_owned(),
                ancestor_path: "foo/bar".to_owned(),
            },
        );
        assert!(resources
            .get(PACKAGE_CONTEXT_FILE)
            .unwrap()
            .contains("package-path: foo/bar"));
    }

    #[test]
    fn init_overlays_existing_files() {
        let mutation = InitPackageMutation::new(
            "net".into(),
            InitTaskSpec::default(),
            PackageConfig::default(),
        );
        let mut base = PackageResources::new();
        base.insert("keep.yaml", "kind: Keep\n");
        let (resources, _) = mutation.apply(&CancelToken::new(), base).unwrap();
        assert!(resources.get("keep.yaml").is_some());
        assert!(resources.get(PACKFILE_NAME).is_some());
    }
}
