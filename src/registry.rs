//! Codec registration: a pluggable lookup consulted for structure
//! identifiers the built-in table does not handle.
//!
//! Persistence and synchronization belong to the [`RegistryStore`]
//! capability; loading plugin modules and resolving their symbols belongs
//! to [`PluginResolver`]. The crate ships [`MemoryRegistry`] for embedders
//! without persistent configuration and for tests; it provides its own
//! locking, as the store contract requires.

use {
    crate::{
        arena::Arena,
        asn1::DecodeOptions,
        dispatch::{Decoded, EncodingType, StructValue, StructureId},
        ensure_err,
        error::{Error, Result},
    },
    std::{
        collections::HashMap,
        sync::RwLock,
    },
    tracing::debug,
};

/// Function-name keys the dispatcher consults. Registered entries override
/// the public entry point of the same name.
pub const FUNC_ENCODE_OBJECT: &str = "CryptEncodeObject";
pub const FUNC_ENCODE_OBJECT_EX: &str = "CryptEncodeObjectEx";
pub const FUNC_DECODE_OBJECT: &str = "CryptDecodeObject";
pub const FUNC_DECODE_OBJECT_EX: &str = "CryptDecodeObjectEx";

/// Value name holding the plugin module under a registered entry.
pub const VALUE_MODULE: &str = "Module";
/// Value name holding an override symbol under a registered entry.
pub const VALUE_FUNC_NAME: &str = "FuncName";
/// Value type tag for UTF-8 string values.
pub const VALUE_TYPE_STRING: u32 = 1;

/// Key of one registered entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EntryKey {
    pub encoding: u32,
    pub func_name: String,
    pub id_key: String,
}

impl EntryKey {
    pub fn new(encoding: EncodingType, func_name: &str, id: &StructureId) -> Self {
        Self {
            encoding: encoding.raw(),
            func_name: func_name.to_string(),
            id_key: id.registry_key(),
        }
    }
}

/// Storage capability for registry entries and their named values.
///
/// Implementations provide their own synchronization: each operation is
/// atomic on its own.
pub trait RegistryStore: Send + Sync {
    /// Create the entry if it does not exist.
    fn put_entry(&self, key: &EntryKey) -> Result<()>;

    /// Remove the entry and its values. Fails with
    /// [`Error::NotFound`] when absent.
    fn remove_entry(&self, key: &EntryKey) -> Result<()>;

    /// Read a named value under the entry, or `None` when either the entry
    /// or the value is absent.
    fn read_value(&self, key: &EntryKey, name: &str) -> Result<Option<(u32, Vec<u8>)>>;

    /// Write a named value under the entry. Fails with
    /// [`Error::NotFound`] when the entry is absent.
    fn write_value(&self, key: &EntryKey, name: &str, value_type: u32, data: &[u8]) -> Result<()>;
}

fn id_key_present(id: &StructureId) -> bool {
    match id {
        StructureId::Numeric(_) => true,
        StructureId::Oid(oid) => !oid.is_empty(),
    }
}

/// Register a plugin module for a structure identifier under one function
/// name. Silently succeeds without writing when the encoding type has no
/// certificate half (only certificate structures are registrable) or when
/// the module name is empty.
pub fn register(
    store: &dyn RegistryStore,
    encoding: EncodingType,
    func_name: &str,
    id: &StructureId,
    module: &str,
    override_symbol: Option<&str>,
) -> Result<()> {
    if encoding.cert_encoding() == 0 || module.is_empty() {
        return Ok(());
    }
    ensure_err!(!func_name.is_empty(), Error::InvalidParameter);
    ensure_err!(id_key_present(id), Error::InvalidParameter);
    let key = EntryKey::new(encoding, func_name, id);
    store.put_entry(&key)?;
    if let Some(symbol) = override_symbol {
        store.write_value(&key, VALUE_FUNC_NAME, VALUE_TYPE_STRING, symbol.as_bytes())?;
    }
    store.write_value(&key, VALUE_MODULE, VALUE_TYPE_STRING, module.as_bytes())
}

/// Remove a registration.
pub fn unregister(
    store: &dyn RegistryStore,
    encoding: EncodingType,
    func_name: &str,
    id: &StructureId,
) -> Result<()> {
    if encoding.cert_encoding() == 0 {
        return Ok(());
    }
    ensure_err!(!func_name.is_empty(), Error::InvalidParameter);
    ensure_err!(id_key_present(id), Error::InvalidParameter);
    store.remove_entry(&EntryKey::new(encoding, func_name, id))
}

/// Read a generic named value under a registered entry.
pub fn get_value(
    store: &dyn RegistryStore,
    encoding: EncodingType,
    func_name: &str,
    id: &StructureId,
    value_name: &str,
) -> Result<(u32, Vec<u8>)> {
    ensure_err!(encoding.cert_encoding() != 0, Error::NotFound);
    ensure_err!(!func_name.is_empty(), Error::InvalidParameter);
    ensure_err!(id_key_present(id), Error::InvalidParameter);
    ensure_err!(!value_name.is_empty(), Error::InvalidParameter);
    store
        .read_value(&EntryKey::new(encoding, func_name, id), value_name)?
        .ok_or(Error::NotFound)
}

/// Write a generic named value under a registered entry.
pub fn set_value(
    store: &dyn RegistryStore,
    encoding: EncodingType,
    func_name: &str,
    id: &StructureId,
    value_name: &str,
    value_type: u32,
    data: &[u8],
) -> Result<()> {
    if encoding.cert_encoding() == 0 {
        return Ok(());
    }
    ensure_err!(!func_name.is_empty(), Error::InvalidParameter);
    ensure_err!(id_key_present(id), Error::InvalidParameter);
    ensure_err!(!value_name.is_empty(), Error::InvalidParameter);
    store.write_value(&EntryKey::new(encoding, func_name, id), value_name, value_type, data)
}

/// A resolved registration: which module serves the entry, and which
/// symbol to ask it for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PluginRef {
    pub module: String,
    pub symbol: String,
}

/// Look up the module and symbol registered for `(encoding, func_name,
/// id)`. The symbol is the entry's override when one is stored, otherwise
/// the queried function name. A present module value is the predicate; a
/// store failure reads as a miss.
pub(crate) fn lookup(
    store: &dyn RegistryStore,
    encoding: EncodingType,
    func_name: &str,
    id: &StructureId,
) -> Option<PluginRef> {
    let key = EntryKey::new(encoding, func_name, id);
    let (value_type, module) = store.read_value(&key, VALUE_MODULE).ok()??;
    if value_type != VALUE_TYPE_STRING {
        return None;
    }
    let module = String::from_utf8(module).ok()?;
    if module.is_empty() {
        return None;
    }
    let symbol = store
        .read_value(&key, VALUE_FUNC_NAME)
        .ok()
        .flatten()
        .filter(|(value_type, _)| *value_type == VALUE_TYPE_STRING)
        .and_then(|(_, data)| String::from_utf8(data).ok())
        .unwrap_or_else(|| func_name.to_string());
    debug!(module = %module, symbol = %symbol, "registry hit");
    Some(PluginRef { module, symbol })
}

/// Encoder with the same signature as the built-in codecs, resolved from a
/// plugin module.
pub trait ObjectEncoder {
    fn encode(
        &self,
        encoding: EncodingType,
        id: &StructureId,
        value: &StructValue<'_>,
        out: Option<&mut [u8]>,
    ) -> Result<usize>;
}

/// Decoder with the same signature as the built-in codecs, resolved from a
/// plugin module.
pub trait ObjectDecoder {
    fn decoded_size(
        &self,
        encoding: EncodingType,
        id: &StructureId,
        input: &[u8],
        opts: &DecodeOptions,
    ) -> Result<usize>;

    fn decode<'a>(
        &self,
        encoding: EncodingType,
        id: &StructureId,
        input: &'a [u8],
        opts: &DecodeOptions,
        arena: &mut Arena<'a>,
    ) -> Result<Decoded<'a>>;
}

/// A loaded plugin module. Dropped by the dispatcher as soon as the
/// delegated call returns, on every path.
pub trait PluginModule {
    fn encoder(&self, symbol: &str) -> Option<&dyn ObjectEncoder>;
    fn decoder(&self, symbol: &str) -> Option<&dyn ObjectDecoder>;
}

/// Capability that loads plugin modules by name.
pub trait PluginResolver {
    fn load(&self, module: &str) -> Result<Box<dyn PluginModule + '_>>;
}

/// In-memory [`RegistryStore`] with interior locking.
#[derive(Default)]
pub struct MemoryRegistry {
    entries: RwLock<HashMap<EntryKey, HashMap<String, (u32, Vec<u8>)>>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RegistryStore for MemoryRegistry {
    fn put_entry(&self, key: &EntryKey) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.entry(key.clone()).or_default();
        Ok(())
    }

    fn remove_entry(&self, key: &EntryKey) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(key).map(|_| ()).ok_or(Error::NotFound)
    }

    fn read_value(&self, key: &EntryKey, name: &str) -> Result<Option<(u32, Vec<u8>)>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).and_then(|values| values.get(name).cloned()))
    }

    fn write_value(&self, key: &EntryKey, name: &str, value_type: u32, data: &[u8]) -> Result<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let values = entries.get_mut(key).ok_or(Error::NotFound)?;
        values.insert(name.to_string(), (value_type, data.to_vec()));
        Ok(())
    }
}
