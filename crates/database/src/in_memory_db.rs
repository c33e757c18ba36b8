use database_interface::{EmptyKeeper, Keeper};
use primitives::{Address, Bytes, HashMap, StorageKey, StorageValue, B256, KECCAK_EMPTY};
use state::{AccountChange, AccountInfo, StateChangeset, Storage};
use std::collections::BTreeMap;

/// A [Keeper] implementation that stores all state in memory.
pub type InMemoryKeeper = CacheKeeper<EmptyKeeper>;

/// Cached view of one account in a [CacheKeeper].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CachedAccount {
    /// Account record, `None` if the account was deleted.
    pub info: Option<AccountInfo>,
    /// Slots written through this cache.
    pub storage: Storage,
    /// Committed storage of the inner keeper is hidden, unlisted slots read as zero.
    pub storage_cleared: bool,
}

/// A [Keeper] overlay that buffers every applied change set in memory.
///
/// Reads fall through to the wrapped keeper for anything the cache does not know. Nothing is
/// written to the wrapped keeper until [`CacheKeeper::flush`] is called, so dropping the cache
/// discards every buffered change. This is the coarse commit boundary: a whole message either
/// reaches the wrapped keeper or it does not.
#[derive(Clone, Debug, Default)]
pub struct CacheKeeper<K> {
    /// Accounts touched through this cache, ordered by address.
    pub accounts: BTreeMap<Address, CachedAccount>,
    /// Contract code by hash.
    pub contracts: HashMap<B256, Bytes>,
    /// The wrapped keeper.
    pub inner: K,
}

impl<K> CacheKeeper<K> {
    /// Creates an empty cache over `inner`.
    pub fn new(inner: K) -> Self {
        Self {
            accounts: BTreeMap::new(),
            contracts: HashMap::default(),
            inner,
        }
    }

    /// Inserts an account record, replacing any cached one.
    pub fn insert_account(&mut self, address: Address, info: AccountInfo) {
        self.accounts.entry(address).or_default().info = Some(info);
    }

    /// Inserts code and points the account's code hash at it.
    pub fn insert_code(&mut self, address: Address, code: Bytes) {
        let hash = state::code_hash(&code);
        self.contracts.insert(hash, code);
        let account = self.accounts.entry(address).or_default();
        let mut info = account.info.clone().unwrap_or_default();
        info.code_hash = hash;
        account.info = Some(info);
    }

    /// Inserts a storage slot value.
    ///
    /// Creates an empty account record if none is cached yet.
    pub fn insert_storage(&mut self, address: Address, key: StorageKey, value: StorageValue) {
        let account = self.accounts.entry(address).or_default();
        account.info.get_or_insert_with(AccountInfo::default);
        account.storage.insert(key, value);
    }

    /// Consumes the cache and returns the wrapped keeper, discarding buffered changes.
    pub fn into_inner(self) -> K {
        self.inner
    }

    /// Returns true if nothing was buffered.
    pub fn is_clean(&self) -> bool {
        self.accounts.is_empty()
    }

    fn merge(&mut self, changes: &StateChangeset) {
        for (address, change) in &changes.accounts {
            let account = self.accounts.entry(*address).or_default();
            match change {
                AccountChange::Delete => {
                    account.info = None;
                    account.storage.clear();
                    account.storage_cleared = true;
                }
                AccountChange::Update {
                    info,
                    code,
                    storage,
                } => {
                    account.info = Some(info.clone());
                    account.storage.extend(storage.iter().map(|(k, v)| (*k, *v)));
                    if let Some((hash, code)) = code {
                        self.contracts.insert(*hash, code.clone());
                    }
                }
            }
        }
    }

    /// Builds the change set that replays this cache onto the wrapped keeper.
    pub fn changeset(&self) -> StateChangeset {
        let mut accounts = Vec::with_capacity(self.accounts.len() * 2);
        for (address, account) in &self.accounts {
            match &account.info {
                None if account.storage_cleared => {
                    accounts.push((*address, AccountChange::Delete))
                }
                None => {}
                Some(info) => {
                    if account.storage_cleared {
                        accounts.push((*address, AccountChange::Delete));
                    }
                    let code = self
                        .contracts
                        .get(&info.code_hash)
                        .filter(|_| info.code_hash != KECCAK_EMPTY)
                        .map(|code| (info.code_hash, code.clone()));
                    accounts.push((
                        *address,
                        AccountChange::Update {
                            info: info.clone(),
                            code,
                            storage: account.storage.clone(),
                        },
                    ));
                }
            }
        }
        StateChangeset { accounts }
    }
}

impl<K: Keeper> CacheKeeper<K> {
    /// Writes every buffered change into the wrapped keeper and clears the cache.
    ///
    /// On error the cache is left untouched so the flush can be retried.
    pub fn flush(&mut self) -> Result<(), K::Error> {
        let changes = self.changeset();
        if !changes.is_empty() {
            self.inner.apply(&changes)?;
        }
        self.accounts.clear();
        Ok(())
    }
}

impl<K: Keeper> Keeper for CacheKeeper<K> {
    type Error = K::Error;

    fn account(&mut self, address: Address) -> Result<Option<AccountInfo>, Self::Error> {
        match self.accounts.get(&address) {
            Some(account) if account.info.is_some() || account.storage_cleared => {
                Ok(account.info.clone())
            }
            _ => self.inner.account(address),
        }
    }

    fn code(&mut self, code_hash: B256) -> Result<Option<Bytes>, Self::Error> {
        if code_hash == KECCAK_EMPTY {
            return Ok(Some(Bytes::new()));
        }
        match self.contracts.get(&code_hash) {
            Some(code) => Ok(Some(code.clone())),
            None => self.inner.code(code_hash),
        }
    }

    fn storage(&mut self, address: Address, key: StorageKey) -> Result<StorageValue, Self::Error> {
        if let Some(account) = self.accounts.get(&address) {
            if let Some(value) = account.storage.get(&key) {
                return Ok(*value);
            }
            if account.storage_cleared {
                return Ok(StorageValue::ZERO);
            }
        }
        self.inner.storage(address, key)
    }

    fn apply(&mut self, changes: &StateChangeset) -> Result<(), Self::Error> {
        self.merge(changes);
        Ok(())
    }
}
