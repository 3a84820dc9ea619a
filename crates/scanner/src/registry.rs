//! Registry of monitored proxies.
//!
//! The registry is a hand-curated JSON document mapping network name to
//! proxy address to [`MonitorEntry`]. It is loaded whole, mutated in memory and
//! written back whole. Key order is kept as found in the file.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
    str::FromStr,
};

use alloy::{
    json_abi::Function,
    primitives::{Address, U256},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{error::ScanError, word};

/// All monitored proxies, grouped per network in file order.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    networks: Vec<NetworkEntries>,
}

/// Proxies monitored on a single network.
#[derive(Clone, Debug)]
pub struct NetworkEntries {
    name: String,
    proxies: Vec<ProxyEntry>,
}

/// A proxy address as written in the registry together with its entry.
#[derive(Clone, Debug)]
pub struct ProxyEntry {
    key: String,
    pub entry: MonitorEntry,
}

/// How to obtain the implementation of a single proxy.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct MonitorEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub getter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub getter_arg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    /// Recorded implementations, oldest first, as written in the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    implementations: Option<Vec<String>>,
    /// Keys this tool does not interpret, written back untouched.
    #[serde(flatten)]
    extra: Map<String, Value>,
    /// Key order of the entry as loaded.
    #[serde(skip)]
    key_order: Vec<String>,
}

/// Parsed location of the implementation pointer.
#[derive(Clone, Debug, PartialEq)]
pub enum ImplementationSource {
    /// Storage slot of the proxy holding the implementation word.
    Slot(U256),
    /// View function of the proxy returning the implementation word.
    Getter { function: Function, arg: Option<String> },
}

impl Registry {
    /// Parses the registry from a JSON document.
    pub fn parse(json: &str) -> Result<Self, ScanError> {
        let root: Map<String, Value> = serde_json::from_str(json)?;
        let mut networks = Vec::with_capacity(root.len());
        for (network, proxies) in root {
            let Value::Object(proxies) = proxies else {
                return Err(ScanError::InvalidRegistry(format!(
                    "network `{network}` must map proxy addresses to entries"
                )));
            };
            let proxies = proxies
                .into_iter()
                .map(|(key, entry)| {
                    let key_order = match &entry {
                        Value::Object(fields) => fields.keys().cloned().collect(),
                        _ => Vec::new(),
                    };
                    serde_json::from_value::<MonitorEntry>(entry)
                        .map(|entry| ProxyEntry {
                            key: key.clone(),
                            entry: MonitorEntry { key_order, ..entry },
                        })
                        .map_err(|err| {
                            ScanError::InvalidRegistry(format!("{network}/{key}: {err}"))
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            networks.push(NetworkEntries { name: network, proxies });
        }
        Ok(Self { networks })
    }

    /// Reads and parses the registry file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScanError> {
        Self::parse(&fs::read_to_string(path)?)
    }

    /// Renders the registry as pretty-printed JSON with 2-space indentation.
    pub fn to_json(&self) -> Result<String, ScanError> {
        let mut root = Map::new();
        for network in &self.networks {
            let mut proxies = Map::new();
            for proxy in &network.proxies {
                proxies.insert(proxy.key.clone(), proxy.entry.to_value()?);
            }
            root.insert(network.name.clone(), Value::Object(proxies));
        }
        Ok(serde_json::to_string_pretty(&Value::Object(root))?)
    }

    /// Writes the registry to `path`, replacing the previous file only once
    /// the new contents are fully on disk.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ScanError> {
        let path = path.as_ref();
        let json = self.to_json()?;
        let tmp = temp_path(path);
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn networks(&self) -> &[NetworkEntries] { &self.networks }

    pub fn networks_mut(&mut self) -> &mut [NetworkEntries] { &mut self.networks }

    pub fn network(&self, name: &str) -> Option<&NetworkEntries> {
        self.networks.iter().find(|n| n.name == name)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

impl NetworkEntries {
    pub fn name(&self) -> &str { &self.name }

    pub fn proxies(&self) -> &[ProxyEntry] { &self.proxies }

    pub fn proxies_mut(&mut self) -> &mut [ProxyEntry] { &mut self.proxies }

    pub fn len(&self) -> usize { self.proxies.len() }

    pub fn is_empty(&self) -> bool { self.proxies.is_empty() }

    pub fn get(&self, proxy: Address) -> Option<&MonitorEntry> {
        self.proxies
            .iter()
            .find(|p| p.address().is_ok_and(|a| a == proxy))
            .map(|p| &p.entry)
    }
}

impl ProxyEntry {
    /// Proxy address exactly as written in the registry.
    pub fn key(&self) -> &str { &self.key }

    pub fn address(&self) -> Result<Address, ScanError> {
        Address::from_str(self.key.trim()).map_err(|_| ScanError::InvalidAddress(self.key.clone()))
    }
}

impl MonitorEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            slot: None,
            getter: None,
            getter_arg: None,
            offset: None,
            implementations: None,
            extra: Map::new(),
            key_order: Vec::new(),
        }
    }

    pub fn with_slot(mut self, slot: impl Into<String>) -> Self {
        self.slot = Some(slot.into());
        self
    }

    pub fn with_getter(mut self, getter: impl Into<String>, arg: Option<String>) -> Self {
        self.getter = Some(getter.into());
        self.getter_arg = arg;
        self
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_implementations(mut self, implementations: Vec<Address>) -> Self {
        self.implementations =
            Some(implementations.iter().map(|address| format!("{address:#x}")).collect());
        self
    }

    /// Recorded history exactly as stored, oldest first. Older registries may
    /// hold strings that are not addresses.
    pub fn history(&self) -> &[String] { self.implementations.as_deref().unwrap_or(&[]) }

    /// Known implementations, oldest first. History strings that are not
    /// addresses are left out.
    pub fn implementations(&self) -> Vec<Address> {
        self.history().iter().filter_map(|s| parse_address(s)).collect()
    }

    /// Current (most recently recorded) implementation.
    pub fn current(&self) -> Option<Address> {
        self.history().last().and_then(|s| parse_address(s))
    }

    fn knows(&self, implementation: Address) -> bool {
        self.history().iter().any(|s| parse_address(s) == Some(implementation))
    }

    /// Where the implementation pointer lives. A slot takes precedence over a
    /// getter; `None` means the entry is not configured for reading.
    pub fn source(&self) -> Result<Option<ImplementationSource>, ScanError> {
        if let Some(offset) = self.offset
            && offset > word::MAX_OFFSET
        {
            return Err(ScanError::InvalidOffset(offset));
        }
        if let Some(slot) = &self.slot {
            let parsed =
                U256::from_str(slot.trim()).map_err(|_| ScanError::InvalidSlot(slot.clone()))?;
            return Ok(Some(ImplementationSource::Slot(parsed)));
        }
        if let Some(getter) = &self.getter {
            let getter = getter.trim();
            let signature = if getter.contains('(') {
                getter.to_string()
            } else {
                format!("{getter}()")
            };
            let function = Function::parse(&signature)
                .map_err(|err| ScanError::InvalidGetter(format!("{getter}: {err}")))?;
            let arity_ok = match &self.getter_arg {
                Some(_) => function.inputs.len() == 1,
                None => function.inputs.is_empty(),
            };
            if !arity_ok {
                return Err(ScanError::InvalidGetter(format!(
                    "{signature} takes {} argument(s), {} configured",
                    function.inputs.len(),
                    usize::from(self.getter_arg.is_some())
                )));
            }
            return Ok(Some(ImplementationSource::Getter { function, arg: self.getter_arg.clone() }));
        }
        Ok(None)
    }

    /// Appends `implementation` unless it is already known. Returns whether the
    /// entry changed.
    pub fn record(&mut self, implementation: Address) -> bool {
        if self.knows(implementation) {
            return false;
        }
        self.implementations.get_or_insert_with(Vec::new).push(format!("{implementation:#x}"));
        true
    }

    /// Whether the entry holds exactly one implementation, i.e. it was just
    /// observed for the first time and its predecessor may be recovered.
    pub fn needs_backfill(&self) -> bool { self.history().len() == 1 }

    /// Inserts the implementation preceding the only known one. Refuses the
    /// zero address, known addresses and entries with a longer history.
    pub fn prepend(&mut self, previous: Address) -> bool {
        if previous.is_zero() || !self.needs_backfill() || self.knows(previous) {
            return false;
        }
        self.implementations.get_or_insert_with(Vec::new).insert(0, format!("{previous:#x}"));
        true
    }

    /// JSON object of the entry with keys in their loaded order. Keys the
    /// entry did not have before are appended.
    fn to_value(&self) -> Result<Value, ScanError> {
        let fields = match serde_json::to_value(self)? {
            Value::Object(fields) => fields,
            other => return Ok(other),
        };
        let mut ordered = self
            .key_order
            .iter()
            .filter_map(|key| fields.get(key).map(|value| (key.clone(), value.clone())))
            .collect::<Map<_, _>>();
        for (key, value) in fields {
            if !ordered.contains_key(&key) {
                ordered.insert(key, value);
            }
        }
        Ok(Value::Object(ordered))
    }
}

fn parse_address(s: &str) -> Option<Address> { Address::from_str(s.trim()).ok() }
