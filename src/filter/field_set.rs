//! Filter values and options
//!
//! A [`FieldSet`] owns the current value of every filter field plus the
//! facet-derived option lists used to render selects. Values and options are
//! two independent notification channels: option refreshes never wake value
//! subscribers, and value updates never touch options.
//!
//! Value notifications are duplicate-suppressing. An update that leaves the
//! effective values as they were (for example writing a field's default into
//! an unset field) is applied silently.

use crate::error::{Result, SearchError};
use crate::filter::params::{ParamPatch, QueryParams};
use crate::filter::spec::{normalize_value, FieldOption, FilterFieldSpec};
use std::collections::{BTreeMap, HashMap};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

/// Field name -> effective value
pub type FieldValues = BTreeMap<String, String>;

/// Where a value change came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSource {
    /// Applied from the router's query parameters
    Route,
    /// Form submission or direct programmatic edit
    User,
    /// Page navigation
    Pagination,
}

/// Value notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    /// The minimal effective mapping (see [`FieldSet::values`])
    pub values: FieldValues,
    pub source: ChangeSource,
}

/// Option list notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionsChange {
    pub field: String,
    pub options: Vec<FieldOption>,
}

/// Result of polling a subscription
#[derive(Debug, PartialEq, Eq)]
pub enum StreamPoll<T> {
    Ready(T),
    Pending,
    /// The producing field set was closed and the queue is drained
    Closed,
}

/// Receiving end of a field set channel
pub struct Subscription<T> {
    rx: Receiver<T>,
}

impl<T> Subscription<T> {
    pub fn poll(&self) -> StreamPoll<T> {
        match self.rx.try_recv() {
            Ok(item) => StreamPoll::Ready(item),
            Err(TryRecvError::Empty) => StreamPoll::Pending,
            Err(TryRecvError::Disconnected) => StreamPoll::Closed,
        }
    }

    /// Next queued notification, if any
    pub fn try_next(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Take everything queued so far
    pub fn drain(&self) -> Vec<T> {
        self.rx.try_iter().collect()
    }
}

#[derive(Debug, Clone)]
struct FieldSlot {
    spec: FilterFieldSpec,
    value: Option<String>,
    /// Facet-derived options; `None` until the first `set_options`
    dynamic_options: Option<Vec<FieldOption>>,
}

/// Current filter values plus their selectable options
pub struct FieldSet {
    slots: Vec<FieldSlot>,
    /// Name and alias -> slot index
    index: HashMap<String, usize>,
    value_subscribers: Vec<Sender<FieldChange>>,
    option_subscribers: Vec<Sender<OptionsChange>>,
    closed: bool,
}

impl FieldSet {
    /// Build a field set. Names and aliases must be unique across all specs.
    pub fn new(specs: impl IntoIterator<Item = FilterFieldSpec>) -> Result<Self> {
        let mut slots = Vec::new();
        let mut index = HashMap::new();

        for spec in specs {
            let idx = slots.len();
            for key in std::iter::once(&spec.name).chain(spec.alias.as_ref()) {
                if index.insert(key.clone(), idx).is_some() {
                    return Err(SearchError::DuplicateField { name: key.clone() });
                }
            }
            slots.push(FieldSlot {
                spec,
                value: None,
                dynamic_options: None,
            });
        }

        Ok(Self {
            slots,
            index,
            value_subscribers: Vec::new(),
            option_subscribers: Vec::new(),
            closed: false,
        })
    }

    /// Field specs in declaration order
    pub fn specs(&self) -> impl Iterator<Item = &FilterFieldSpec> {
        self.slots.iter().map(|slot| &slot.spec)
    }

    /// Look up a spec by name or alias
    pub fn spec(&self, key: &str) -> Option<&FilterFieldSpec> {
        self.index.get(key).map(|&idx| &self.slots[idx].spec)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Merge `partial` into the current values with user provenance.
    /// See [`FieldSet::update_from`].
    pub fn update<K, V>(
        &mut self,
        partial: impl IntoIterator<Item = (K, Option<V>)>,
    ) -> Result<bool>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.update_from(partial, ChangeSource::User)
    }

    /// Merge `partial` into the current values. Keys may be names or aliases;
    /// `None` (or a blank string) unsets a field. Keys not mentioned keep their
    /// value. Fails without applying anything if any key is unknown.
    ///
    /// Returns whether the effective values changed, which is also whether a
    /// notification was sent.
    pub fn update_from<K, V>(
        &mut self,
        partial: impl IntoIterator<Item = (K, Option<V>)>,
        source: ChangeSource,
    ) -> Result<bool>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        if self.closed {
            return Err(SearchError::Disposed);
        }

        let mut writes = Vec::new();
        for (key, value) in partial {
            let key = key.as_ref();
            let idx = *self
                .index
                .get(key)
                .ok_or_else(|| SearchError::unknown_field(key))?;
            writes.push((idx, normalize_value(value.as_ref().map(|v| v.as_ref()))));
        }

        let before = self.effective_snapshot();
        for (idx, value) in writes {
            self.slots[idx].value = value;
        }

        if self.effective_snapshot() == before {
            return Ok(false);
        }

        let change = FieldChange {
            values: self.values(),
            source,
        };
        tracing::debug!(?source, values = ?change.values, "Filter values changed");
        self.value_subscribers
            .retain(|tx| tx.send(change.clone()).is_ok());
        Ok(true)
    }

    pub fn set_field_value(&mut self, name: &str, value: Option<&str>) -> Result<bool> {
        self.update([(name, value)])
    }

    /// Replace every field's value from query parameters. Fields the params
    /// do not mention are unset; unrecognized keys are ignored.
    pub fn apply_params(&mut self, params: &QueryParams, source: ChangeSource) -> Result<bool> {
        let partial: Vec<(String, Option<String>)> = self
            .slots
            .iter()
            .map(|slot| {
                let spec = &slot.spec;
                let value = params
                    .get(&spec.name)
                    .or_else(|| spec.alias.as_deref().and_then(|alias| params.get(alias)))
                    .map(str::to_string);
                (spec.name.clone(), value)
            })
            .collect();
        self.update_from(partial, source)
    }

    /// Effective value of a field: its value, else its default.
    /// `None` for unset fields without default and for unknown keys.
    pub fn get_field_value(&self, key: &str) -> Option<&str> {
        let slot = &self.slots[*self.index.get(key)?];
        slot.spec.effective(slot.value.as_deref())
    }

    /// Whether a field holds a non-blank value other than its default
    pub fn has_value(&self, key: &str) -> bool {
        self.index.get(key).is_some_and(|&idx| {
            let slot = &self.slots[idx];
            slot.value.is_some() && !slot.spec.is_default(slot.value.as_deref())
        })
    }

    /// Replace the dynamic option list of a field. Values are untouched and
    /// value subscribers are not notified.
    pub fn set_options(&mut self, key: &str, options: Vec<FieldOption>) -> Result<()> {
        if self.closed {
            return Err(SearchError::Disposed);
        }
        let idx = *self
            .index
            .get(key)
            .ok_or_else(|| SearchError::unknown_field(key))?;
        let slot = &mut self.slots[idx];
        if slot.dynamic_options.as_ref() == Some(&options) {
            return Ok(());
        }

        let change = OptionsChange {
            field: slot.spec.name.clone(),
            options: options.clone(),
        };
        slot.dynamic_options = Some(options);
        self.option_subscribers
            .retain(|tx| tx.send(change.clone()).is_ok());
        Ok(())
    }

    /// Options to render for a field: the dynamic list once set, the static
    /// spec options before that.
    pub fn options(&self, key: &str) -> &[FieldOption] {
        match self.index.get(key) {
            Some(&idx) => {
                let slot = &self.slots[idx];
                slot.dynamic_options
                    .as_deref()
                    .unwrap_or(slot.spec.options.as_slice())
            }
            None => &[],
        }
    }

    /// Minimal effective mapping for the query layer. Unset fields are left
    /// out, as are fields at their default unless the field keeps defaults.
    pub fn values(&self) -> FieldValues {
        self.slots
            .iter()
            .filter_map(|slot| {
                let spec = &slot.spec;
                let effective = spec.effective(slot.value.as_deref())?;
                if spec.suppress_when_default && spec.is_default(slot.value.as_deref()) {
                    return None;
                }
                Some((spec.name.clone(), effective.to_string()))
            })
            .collect()
    }

    /// URL-ready parameters in declaration order, keyed by canonical name.
    /// Fields at their default never appear, hidden or not; a hidden field
    /// that moved off its default (the page number) does.
    pub fn query_params(&self) -> QueryParams {
        self.slots
            .iter()
            .filter(|slot| !slot.spec.is_default(slot.value.as_deref()))
            .filter_map(|slot| {
                slot.spec
                    .effective(slot.value.as_deref())
                    .map(|value| (slot.spec.name.clone(), value.to_string()))
            })
            .collect()
    }

    /// Router patch that makes the address bar match `query_params`: every
    /// managed key is either written or removed, aliases are always removed.
    pub fn url_patch(&self) -> ParamPatch {
        let params = self.query_params();
        let mut patch = ParamPatch::new();
        for slot in &self.slots {
            let name = &slot.spec.name;
            patch.push((name.clone(), params.get(name).map(str::to_string)));
            if let Some(alias) = &slot.spec.alias {
                patch.push((alias.clone(), None));
            }
        }
        patch
    }

    /// Subscribe to value changes
    pub fn subscribe(&mut self) -> Subscription<FieldChange> {
        let (tx, rx) = mpsc::channel();
        if !self.closed {
            self.value_subscribers.push(tx);
        }
        Subscription { rx }
    }

    /// Subscribe to option list changes
    pub fn subscribe_options(&mut self) -> Subscription<OptionsChange> {
        let (tx, rx) = mpsc::channel();
        if !self.closed {
            self.option_subscribers.push(tx);
        }
        Subscription { rx }
    }

    /// Close both notification channels. Further mutations fail with
    /// [`SearchError::Disposed`].
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.value_subscribers.clear();
        self.option_subscribers.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn effective_snapshot(&self) -> Vec<Option<String>> {
        self.slots
            .iter()
            .map(|slot| slot.spec.effective(slot.value.as_deref()).map(str::to_string))
            .collect()
    }
}

impl std::fmt::Debug for FieldSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldSet")
            .field("values", &self.values())
            .field("closed", &self.closed)
            .finish()
    }
}
