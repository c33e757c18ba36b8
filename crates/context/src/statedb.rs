//! Journaled state database.
use crate::journal::{Journal, JournalEntry, JournaledState};
use database_interface::{DBErrorMarker, Keeper};
use primitives::{Address, Bytes, Log, StorageKey, StorageValue, B256, KECCAK_EMPTY, U256};
use state::{code_hash, AccountChange, StateChangeset, StateObject};
use tracing::{debug, trace};

/// Error returned by [`StateDb`] operations.
#[derive(Debug, thiserror::Error)]
pub enum StateDbError<E> {
    /// The keeper failed to read or apply state.
    #[error("keeper error: {0}")]
    Database(#[from] E),
    /// A balance subtraction would go below zero.
    #[error("insufficient balance of {address}: have {balance}, want {amount}")]
    BalanceUnderflow {
        /// Debited account.
        address: Address,
        /// Balance before the subtraction.
        balance: U256,
        /// Amount that was to be subtracted.
        amount: U256,
    },
}

/// Identifiers of the transaction currently running on a [`StateDb`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TxConfig {
    /// Hash of the block being built.
    pub block_hash: B256,
    /// Hash of the running transaction.
    pub tx_hash: B256,
    /// Index of the transaction within the block.
    pub tx_index: u64,
    /// Number of logs emitted by earlier transactions of the block.
    pub log_index: u64,
}

/// Copy-on-write account state over a [`Keeper`] with snapshot and revert.
///
/// Every mutator records exactly one [`JournalEntry`] before it changes anything, so
/// [`StateDb::revert_to_snapshot`] restores the state bit for bit. Mutations that would not
/// change a value are skipped and leave no entry.
#[derive(Debug)]
pub struct StateDb<DB> {
    keeper: DB,
    state: JournaledState,
    journal: Journal,
    tx: TxConfig,
}

type Result<T, E> = core::result::Result<T, StateDbError<E>>;

impl<DB: Keeper> StateDb<DB> {
    /// Creates an empty state database over `keeper`.
    pub fn new(keeper: DB) -> Self {
        Self::with_tx_config(keeper, TxConfig::default())
    }

    /// Creates an empty state database for the given transaction.
    pub fn with_tx_config(keeper: DB, tx: TxConfig) -> Self {
        Self {
            keeper,
            state: JournaledState::default(),
            journal: Journal::new(),
            tx,
        }
    }

    /// Returns the transaction identifiers.
    pub fn tx_config(&self) -> &TxConfig {
        &self.tx
    }

    /// Returns the underlying keeper.
    pub fn keeper(&self) -> &DB {
        &self.keeper
    }

    /// Returns the underlying keeper mutably.
    pub fn keeper_mut(&mut self) -> &mut DB {
        &mut self.keeper
    }

    /// Consumes the database and returns the keeper. Uncommitted changes are dropped.
    pub fn into_keeper(self) -> DB {
        self.keeper
    }

    /// Returns the journal.
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Returns the journaled state.
    pub fn state(&self) -> &JournaledState {
        &self.state
    }

    fn append(&mut self, entry: JournalEntry) {
        trace!(target: "statedb", ?entry, "journal");
        self.journal.append(entry);
    }

    /// Loads the state object of `address`, `None` if the account does not exist.
    fn load(&mut self, address: Address) -> Result<Option<&mut StateObject>, DB::Error> {
        if !self.state.objects.contains_key(&address) {
            let Some(info) = self.keeper.account(address)? else {
                return Ok(None);
            };
            self.state
                .objects
                .insert(address, StateObject::new(address, info));
        }
        Ok(self.state.objects.get_mut(&address))
    }

    /// Returns the state object of `address`, creating it if the account does not exist.
    pub fn get_or_new(&mut self, address: Address) -> Result<&mut StateObject, DB::Error> {
        if self.load(address)?.is_none() {
            self.append(JournalEntry::CreateObject { address });
            self.state
                .objects
                .insert(address, StateObject::new_created(address));
        }
        Ok(self.state.object_mut(address))
    }

    /// Explicitly creates an account.
    ///
    /// An existing account is replaced by a fresh one that only keeps its balance. This
    /// happens when a contract is deployed to an address that already received value.
    pub fn create_account(&mut self, address: Address) -> Result<(), DB::Error> {
        let mut fresh = StateObject::new_created(address);
        match self.load(address)? {
            Some(prev) => {
                let prev = prev.clone();
                fresh.set_balance(prev.balance());
                self.append(JournalEntry::ResetObject {
                    prev: Box::new(prev),
                });
            }
            None => self.append(JournalEntry::CreateObject { address }),
        }
        self.state.objects.insert(address, fresh);
        Ok(())
    }

    /// Returns true if the account exists. Self-destructed accounts exist until commit.
    pub fn exist(&mut self, address: Address) -> Result<bool, DB::Error> {
        Ok(self.load(address)?.is_some())
    }

    /// Returns true if the account does not exist or is empty per EIP-161.
    pub fn empty(&mut self, address: Address) -> Result<bool, DB::Error> {
        Ok(self.load(address)?.is_none_or(|object| object.is_empty()))
    }

    /// Balance of the account, zero if it does not exist.
    pub fn get_balance(&mut self, address: Address) -> Result<U256, DB::Error> {
        Ok(self
            .load(address)?
            .map(|object| object.balance())
            .unwrap_or_default())
    }

    /// Nonce of the account, zero if it does not exist.
    pub fn get_nonce(&mut self, address: Address) -> Result<u64, DB::Error> {
        Ok(self.load(address)?.map(|object| object.nonce()).unwrap_or(0))
    }

    /// Code hash of the account, the zero hash if it does not exist.
    pub fn get_code_hash(&mut self, address: Address) -> Result<B256, DB::Error> {
        Ok(self
            .load(address)?
            .map(|object| object.code_hash())
            .unwrap_or(B256::ZERO))
    }

    /// Code of the account, empty if it does not exist or has no code.
    pub fn get_code(&mut self, address: Address) -> Result<Bytes, DB::Error> {
        let Some(object) = self.load(address)? else {
            return Ok(Bytes::new());
        };
        if let Some(code) = &object.code {
            return Ok(code.clone());
        }
        let hash = object.code_hash();
        if hash == KECCAK_EMPTY {
            return Ok(Bytes::new());
        }
        let code = self.keeper.code(hash)?.unwrap_or_default();
        self.state.object_mut(address).code = Some(code.clone());
        Ok(code)
    }

    /// Size of the account code.
    pub fn get_code_size(&mut self, address: Address) -> Result<usize, DB::Error> {
        self.get_code(address).map(|code| code.len())
    }

    /// Current value of a storage slot. Uncommitted writes win over committed values.
    pub fn get_state(
        &mut self,
        address: Address,
        key: StorageKey,
    ) -> Result<StorageValue, DB::Error> {
        let Some(object) = self.load(address)? else {
            return Ok(StorageValue::ZERO);
        };
        if let Some(value) = object.known_state(&key) {
            return Ok(value);
        }
        self.load_origin(address, key)
    }

    /// Committed value of a storage slot, ignoring writes of this block.
    pub fn get_committed_state(
        &mut self,
        address: Address,
        key: StorageKey,
    ) -> Result<StorageValue, DB::Error> {
        let Some(object) = self.load(address)? else {
            return Ok(StorageValue::ZERO);
        };
        if let Some(value) = object.origin_state(&key) {
            return Ok(value);
        }
        self.load_origin(address, key)
    }

    fn load_origin(
        &mut self,
        address: Address,
        key: StorageKey,
    ) -> Result<StorageValue, DB::Error> {
        let value = self.keeper.storage(address, key)?;
        self.state.object_mut(address).cache_origin(key, value);
        Ok(value)
    }

    /// Adds `amount` to the balance, creating the account if needed.
    pub fn add_balance(&mut self, address: Address, amount: U256) -> Result<(), DB::Error> {
        let balance = self.get_or_new(address)?.balance();
        self.set_balance(address, balance.saturating_add(amount))
    }

    /// Subtracts `amount` from the balance.
    pub fn sub_balance(&mut self, address: Address, amount: U256) -> Result<(), DB::Error> {
        if amount.is_zero() {
            return Ok(());
        }
        let balance = self.get_balance(address)?;
        let Some(new) = balance.checked_sub(amount) else {
            return Err(StateDbError::BalanceUnderflow {
                address,
                balance,
                amount,
            });
        };
        self.set_balance(address, new)
    }

    /// Sets the balance, creating the account if needed.
    pub fn set_balance(&mut self, address: Address, balance: U256) -> Result<(), DB::Error> {
        let prev = self.get_or_new(address)?.balance();
        if prev != balance {
            self.append(JournalEntry::BalanceChange { address, prev });
            self.state.object_mut(address).set_balance(balance);
        }
        Ok(())
    }

    /// Sets the nonce, creating the account if needed.
    pub fn set_nonce(&mut self, address: Address, nonce: u64) -> Result<(), DB::Error> {
        let prev = self.get_or_new(address)?.nonce();
        if prev != nonce {
            self.append(JournalEntry::NonceChange { address, prev });
            self.state.object_mut(address).set_nonce(nonce);
        }
        Ok(())
    }

    /// Replaces the code, creating the account if needed.
    pub fn set_code(&mut self, address: Address, code: Bytes) -> Result<(), DB::Error> {
        let object = self.get_or_new(address)?;
        let hash = code_hash(&code);
        if object.code_hash() == hash && object.code.is_some() {
            return Ok(());
        }
        let entry = JournalEntry::CodeChange {
            address,
            prev_code: object.code.clone(),
            prev_hash: object.code_hash(),
            prev_dirty: object.dirty_code,
        };
        self.append(entry);
        self.state.object_mut(address).set_code(hash, code);
        Ok(())
    }

    /// Writes a storage slot, creating the account if needed. Zero deletes the slot.
    pub fn set_state(
        &mut self,
        address: Address,
        key: StorageKey,
        value: StorageValue,
    ) -> Result<(), DB::Error> {
        self.get_or_new(address)?;
        if self.get_state(address, key)? == value {
            return Ok(());
        }
        let object = self.state.object_mut(address);
        let prev = object.dirty_state(&key);
        object.set_state(key, value);
        self.append(JournalEntry::StorageChange { address, key, prev });
        Ok(())
    }

    /// Marks the account as self-destructed and clears its balance.
    ///
    /// Returns false if the account does not exist.
    pub fn suicide(&mut self, address: Address) -> Result<bool, DB::Error> {
        let Some(object) = self.load(address)? else {
            return Ok(false);
        };
        let entry = JournalEntry::Suicide {
            address,
            prev: object.suicided,
            prev_balance: object.balance(),
        };
        object.suicided = true;
        object.set_balance(U256::ZERO);
        self.append(entry);
        Ok(true)
    }

    /// Returns true if the account was self-destructed in this block.
    pub fn has_suicided(&mut self, address: Address) -> Result<bool, DB::Error> {
        Ok(self.load(address)?.is_some_and(|object| object.suicided))
    }

    /// Adds gas to the refund counter.
    pub fn add_refund(&mut self, gas: u64) {
        if gas == 0 {
            return;
        }
        let prev = self.state.refund;
        self.append(JournalEntry::RefundChange { prev });
        self.state.refund = prev.saturating_add(gas);
    }

    /// Removes gas from the refund counter.
    ///
    /// # Panics
    ///
    /// Panics if the counter would go below zero.
    pub fn sub_refund(&mut self, gas: u64) {
        if gas == 0 {
            return;
        }
        let prev = self.state.refund;
        let refund = prev
            .checked_sub(gas)
            .unwrap_or_else(|| panic!("refund counter below zero (gas: {gas} > refund: {prev})"));
        self.append(JournalEntry::RefundChange { prev });
        self.state.refund = refund;
    }

    /// Current value of the refund counter.
    pub fn get_refund(&self) -> u64 {
        self.state.refund
    }

    /// Appends a log of the running transaction.
    pub fn add_log(&mut self, log: Log) {
        self.append(JournalEntry::AddLog);
        self.state.logs.push(log);
    }

    /// Logs of the running transaction.
    pub fn logs(&self) -> &[Log] {
        &self.state.logs
    }

    /// Warms the sender, the destination, the precompiles and the transaction access list.
    pub fn prepare_access_list(
        &mut self,
        sender: Address,
        dest: Option<Address>,
        precompiles: impl IntoIterator<Item = Address>,
        access_list: impl IntoIterator<Item = (Address, Vec<StorageKey>)>,
    ) {
        self.add_address_to_access_list(sender);
        if let Some(dest) = dest {
            self.add_address_to_access_list(dest);
        }
        for address in precompiles {
            self.add_address_to_access_list(address);
        }
        for (address, keys) in access_list {
            self.add_address_to_access_list(address);
            for key in keys {
                self.add_slot_to_access_list(address, key);
            }
        }
    }

    /// Adds an address to the access list.
    pub fn add_address_to_access_list(&mut self, address: Address) {
        if self.state.access_list.add_address(address) {
            self.append(JournalEntry::AccessListAddAccount { address });
        }
    }

    /// Adds a slot, and its address if needed, to the access list.
    pub fn add_slot_to_access_list(&mut self, address: Address, slot: StorageKey) {
        let (address_added, slot_added) = self.state.access_list.add_slot(address, slot);
        // Address entry must be older than the slot entry so revert removes the slot first.
        if address_added {
            self.append(JournalEntry::AccessListAddAccount { address });
        }
        if slot_added {
            self.append(JournalEntry::AccessListAddSlot { address, slot });
        }
    }

    /// Returns true if the address is in the access list.
    pub fn address_in_access_list(&self, address: &Address) -> bool {
        self.state.access_list.contains_address(address)
    }

    /// Returns whether the address and the slot are in the access list.
    pub fn slot_in_access_list(&self, address: &Address, slot: &StorageKey) -> (bool, bool) {
        self.state.access_list.contains(address, slot)
    }

    /// Returns an identifier of the current state to revert to.
    #[inline]
    pub fn snapshot(&self) -> usize {
        self.journal.len()
    }

    /// Reverts every change made since `snapshot`.
    ///
    /// # Panics
    ///
    /// Panics if `snapshot` was never handed out by [`StateDb::snapshot`].
    pub fn revert_to_snapshot(&mut self, snapshot: usize) {
        trace!(target: "statedb", snapshot, len = self.journal.len(), "revert");
        self.journal.revert(&mut self.state, snapshot);
    }

    /// Builds the change set of every dirty account, in ascending address order.
    ///
    /// Self-destructed and empty accounts are deleted.
    pub fn changeset(&self) -> StateChangeset {
        let mut accounts = Vec::new();
        for address in self.journal.sorted_dirties() {
            let Some(object) = self.state.objects.get(&address) else {
                continue;
            };
            if object.suicided || object.is_empty() {
                accounts.push((address, AccountChange::Delete));
                continue;
            }
            // A re-created account must not see the storage of its previous incarnation.
            if object.created {
                accounts.push((address, AccountChange::Delete));
            }
            let code = object
                .code
                .as_ref()
                .filter(|_| object.dirty_code)
                .map(|code| (object.code_hash(), code.clone()));
            accounts.push((
                address,
                AccountChange::Update {
                    info: object.account.clone(),
                    code,
                    storage: object.dirty_storage.clone(),
                },
            ));
        }
        StateChangeset { accounts }
    }

    /// Writes every dirty account to the keeper and clears the journal.
    ///
    /// The keeper applies the change set atomically. On error nothing is written and the
    /// database is left untouched, so the commit can be retried.
    pub fn commit(&mut self) -> Result<(), DB::Error> {
        let changes = self.changeset();
        if !changes.is_empty() {
            self.keeper.apply(&changes)?;
        }
        debug!(target: "statedb", accounts = changes.len(), "committed");

        for (address, change) in &changes.accounts {
            match change {
                AccountChange::Delete => {
                    self.state.objects.remove(address);
                }
                AccountChange::Update { info, storage, .. } => {
                    let object = self
                        .state
                        .objects
                        .entry(*address)
                        .or_insert_with(|| StateObject::new(*address, info.clone()));
                    object.origin_storage.extend(storage.iter().map(|(k, v)| (*k, *v)));
                    object.dirty_storage.clear();
                    object.dirty_code = false;
                    object.created = false;
                }
            }
        }
        self.journal.clear();
        Ok(())
    }
}

impl<E: DBErrorMarker> StateDbError<E> {
    /// Returns the keeper error, if this is one.
    pub fn as_database(&self) -> Option<&E> {
        match self {
            Self::Database(err) => Some(err),
            Self::BalanceUnderflow { .. } => None,
        }
    }
}
