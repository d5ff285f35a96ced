use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Raw shape of a zapper config file, straight from the YAML parser.
/// Legacy dual shapes (map-or-list services, seq-or-map env_files) are
/// preserved here and harmonized by the normalizer.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    pub project: String,
    #[serde(default)]
    pub git_method: Option<GitMethod>,
    #[serde(default)]
    pub task_delimiters: Option<TaskDelimiters>,
    #[serde(default)]
    pub env_files: Option<EnvFiles>,
    /// Map of supervised local services. `bare_metal` is a legacy spelling.
    #[serde(default, alias = "bare_metal")]
    pub native: Option<BTreeMap<String, RawProcess>>,
    /// Legacy list shape; every entry must carry its own `name`.
    #[serde(default)]
    pub processes: Option<Vec<RawProcess>>,
    #[serde(default)]
    pub docker: Option<BTreeMap<String, RawContainer>>,
    /// Alternate key for `docker`; consulted only when `docker` is absent.
    #[serde(default)]
    pub containers: Option<BTreeMap<String, RawContainer>>,
    #[serde(default)]
    pub tasks: Option<BTreeMap<String, RawTask>>,
    #[serde(default)]
    pub links: Vec<Link>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GitMethod {
    #[default]
    Http,
    Ssh,
    Cli,
}

/// Pass-through link entries; zapper stores and prints them, nothing more.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Link {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct RawProcess {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub profiles: Vec<String>,
    #[serde(default)]
    pub health_check: Option<HealthCheck>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Parent-process variable names forwarded into the service env.
    #[serde(default)]
    pub inherit: Vec<String>,
    #[serde(default)]
    pub cmd: String,
    #[serde(default)]
    pub cwd: Option<String>,
    /// Optional file sourced by the wrapper script before `cmd` runs.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub repo: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct RawContainer {
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub profiles: Vec<String>,
    #[serde(default)]
    pub health_check: Option<HealthCheck>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub inherit: Vec<String>,
    pub image: String,
    #[serde(default)]
    pub ports: Vec<String>,
    #[serde(default)]
    pub volumes: Vec<VolumeSpec>,
    #[serde(default)]
    pub networks: Vec<String>,
    #[serde(default)]
    pub command: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
pub struct RawTask {
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub cmds: Vec<TaskCmd>,
    #[serde(default)]
    pub params: Vec<TaskParam>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub inherit: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TaskParam {
    pub name: String,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub required: bool,
}

// ---------------------------------------------------------------------------
// HealthCheck — nonnegative seconds or a probe URL
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HealthCheck {
    Seconds(u64),
    Url(String),
}

impl Default for HealthCheck {
    fn default() -> Self {
        HealthCheck::Seconds(5)
    }
}

impl<'de> Deserialize<'de> for HealthCheck {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HealthCheckVisitor;

        impl<'de> de::Visitor<'de> for HealthCheckVisitor {
            type Value = HealthCheck;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "a nonnegative number of seconds or a probe URL")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(HealthCheck::Seconds(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                u64::try_from(v)
                    .map(HealthCheck::Seconds)
                    .map_err(|_| E::custom(format!("health_check seconds must be >= 0, got {v}")))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(HealthCheck::Url(v.to_string()))
            }
        }

        deserializer.deserialize_any(HealthCheckVisitor)
    }
}

// ---------------------------------------------------------------------------
// EnvFiles — an unconditional sequence, or a mapping keyed by environment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum EnvFiles {
    Default(Vec<String>),
    Named(BTreeMap<String, Vec<String>>),
}

impl<'de> Deserialize<'de> for EnvFiles {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EnvFilesVisitor;

        impl<'de> de::Visitor<'de> for EnvFilesVisitor {
            type Value = EnvFiles;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(
                    f,
                    "a sequence of env file paths or a mapping of environment name to sequence"
                )
            }

            fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut files = Vec::new();
                while let Some(file) = seq.next_element::<String>()? {
                    files.push(file);
                }
                Ok(EnvFiles::Default(files))
            }

            fn visit_map<A: de::MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut environments = BTreeMap::new();
                while let Some((name, files)) = map.next_entry::<String, Vec<String>>()? {
                    environments.insert(name, files);
                }
                Ok(EnvFiles::Named(environments))
            }
        }

        deserializer.deserialize_any(EnvFilesVisitor)
    }
}

// ---------------------------------------------------------------------------
// TaskDelimiters — a two-element sequence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TaskDelimiters(pub String, pub String);

impl Default for TaskDelimiters {
    fn default() -> Self {
        TaskDelimiters("{{".to_string(), "}}".to_string())
    }
}

impl<'de> Deserialize<'de> for TaskDelimiters {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let parts = Vec::<String>::deserialize(deserializer)?;
        match <[String; 2]>::try_from(parts) {
            Ok([open, close]) => Ok(TaskDelimiters(open, close)),
            Err(parts) => Err(de::Error::custom(format!(
                "task_delimiters must be a pair of strings, got {} element(s)",
                parts.len()
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// VolumeSpec — "name:internalPath" or {name, internal_dir}
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeSpec {
    pub name: String,
    pub internal_dir: String,
}

impl<'de> Deserialize<'de> for VolumeSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct VolumeSpecVisitor;

        #[derive(Deserialize)]
        struct VolumeSpecMap {
            name: String,
            #[serde(alias = "internalDir")]
            internal_dir: String,
        }

        impl<'de> de::Visitor<'de> for VolumeSpecVisitor {
            type Value = VolumeSpec;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "\"name:internalPath\" or a {{name, internal_dir}} mapping")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                let (name, path) = v
                    .split_once(':')
                    .ok_or_else(|| E::custom(format!("volume `{v}` is missing `:internalPath`")))?;
                if name.is_empty() || path.is_empty() {
                    return Err(E::custom(format!("volume `{v}` has an empty segment")));
                }
                Ok(VolumeSpec {
                    name: name.to_string(),
                    internal_dir: path.to_string(),
                })
            }

            fn visit_map<A: de::MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
                let spec =
                    VolumeSpecMap::deserialize(de::value::MapAccessDeserializer::new(map))?;
                Ok(VolumeSpec {
                    name: spec.name,
                    internal_dir: spec.internal_dir,
                })
            }
        }

        deserializer.deserialize_any(VolumeSpecVisitor)
    }
}

// ---------------------------------------------------------------------------
// TaskCmd — a shell string or a {task: name} reference
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum TaskCmd {
    Shell(String),
    TaskRef(String),
}

impl<'de> Deserialize<'de> for TaskCmd {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TaskCmdVisitor;

        #[derive(Deserialize)]
        struct TaskRefMap {
            task: String,
        }

        impl<'de> de::Visitor<'de> for TaskCmdVisitor {
            type Value = TaskCmd;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "a shell command string or a {{task: name}} reference")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(TaskCmd::Shell(v.to_string()))
            }

            fn visit_map<A: de::MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
                let reference =
                    TaskRefMap::deserialize(de::value::MapAccessDeserializer::new(map))?;
                Ok(TaskCmd::TaskRef(reference.task))
            }
        }

        deserializer.deserialize_any(TaskCmdVisitor)
    }
}
