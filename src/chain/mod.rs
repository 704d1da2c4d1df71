//! The signal chain: `Source → effects in order → Sink`.
//!
//! Split the same way as the engine:
//!
//! - [`ChainLayout`] lives on the control thread. It owns the authoritative
//!   order and the stored settings for every kind, validates edits and plans
//!   the next [`ChainOrder`].
//! - [`ChainRunner`] lives on the render thread. It owns the live modules and
//!   the limiter sink, and applies one [`ChainEdit`] at a time between blocks.
//!
//! Each structural edit travels as a single command carrying the complete new
//! order (plus the pre-built module for an insert), so the renderer can never
//! observe a half-linked chain. Detached modules go back to the control thread
//! through the `retired` queue to be dropped there.

use rtrb::{Producer, PushError};
use strum::{EnumCount, IntoEnumIterator};

use crate::{
    dsp::{limiter::Limiter, RenderCtx},
    effects::{EffectKind, EffectModule, EffectParam, EffectSettings},
    error::Result,
};

/// One position in the chain, for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// The summed voice output.
    Source,
    Effect(EffectKind),
    /// The output limiter. Always last.
    Sink,
}

/// Whether an edit did anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Applied,
    /// Duplicate add, missing remove, no-op move. Nothing was sent.
    Unchanged,
}

/// Ordered set of effect kinds. Fixed size, `Copy`, so it can ride inside a
/// render command without allocating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainOrder {
    kinds: [Option<EffectKind>; EffectKind::COUNT],
    len: usize,
}

impl Default for ChainOrder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainOrder {
    pub const fn new() -> Self {
        Self {
            kinds: [None; EffectKind::COUNT],
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = EffectKind> + '_ {
        self.kinds[..self.len].iter().flatten().copied()
    }

    pub fn contains(&self, kind: EffectKind) -> bool {
        self.position(kind).is_some()
    }

    pub fn position(&self, kind: EffectKind) -> Option<usize> {
        self.iter().position(|k| k == kind)
    }

    /// `Source`, every effect in order, then `Sink`.
    pub fn stages(&self) -> impl Iterator<Item = Stage> + '_ {
        std::iter::once(Stage::Source)
            .chain(self.iter().map(Stage::Effect))
            .chain(std::iter::once(Stage::Sink))
    }

    /// Append before the sink. False if `kind` is already present.
    pub fn push(&mut self, kind: EffectKind) -> bool {
        if self.contains(kind) || self.len == EffectKind::COUNT {
            return false;
        }
        self.kinds[self.len] = Some(kind);
        self.len += 1;
        true
    }

    pub fn remove(&mut self, kind: EffectKind) -> bool {
        let Some(index) = self.position(kind) else {
            return false;
        };
        self.kinds.copy_within(index + 1..self.len, index);
        self.len -= 1;
        self.kinds[self.len] = None;
        true
    }

    /// Move `kind` to `index` (clamped to the last effect slot). False when
    /// absent or already there.
    pub fn move_to(&mut self, kind: EffectKind, index: usize) -> bool {
        let Some(from) = self.position(kind) else {
            return false;
        };
        let to = index.min(self.len - 1);
        if from == to {
            return false;
        }
        if from < to {
            self.kinds[from..=to].rotate_left(1);
        } else {
            self.kinds[to..=from].rotate_right(1);
        }
        true
    }
}

/// Control-side view of the chain.
pub struct ChainLayout {
    order: ChainOrder,
    settings: Vec<EffectSettings>,
}

impl Default for ChainLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainLayout {
    pub fn new() -> Self {
        Self {
            order: ChainOrder::new(),
            settings: EffectKind::iter().map(EffectSettings::defaults).collect(),
        }
    }

    pub fn order(&self) -> ChainOrder {
        self.order
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.order.stages().collect()
    }

    pub fn contains(&self, kind: EffectKind) -> bool {
        self.order.contains(kind)
    }

    /// Stored settings for `kind`, whether or not it is in the chain.
    pub fn settings(&self, kind: EffectKind) -> &EffectSettings {
        &self.settings[kind.index()]
    }

    /// The order after adding `kind`, or `None` for a duplicate.
    pub fn plan_add(&self, kind: EffectKind) -> Option<ChainOrder> {
        let mut next = self.order;
        next.push(kind).then_some(next)
    }

    /// The order after removing `kind`, or `None` if it is absent.
    pub fn plan_remove(&self, kind: EffectKind) -> Option<ChainOrder> {
        let mut next = self.order;
        next.remove(kind).then_some(next)
    }

    pub fn plan_move(&self, kind: EffectKind, index: usize) -> Option<ChainOrder> {
        let mut next = self.order;
        next.move_to(kind, index).then_some(next)
    }

    /// Validate and clamp a parameter change without storing it.
    pub fn plan_update(
        &self,
        kind: EffectKind,
        param: EffectParam,
        value: f32,
    ) -> Result<EffectSettings> {
        let mut next = *self.settings(kind);
        next.set(param, value)?;
        Ok(next)
    }

    /// Adopt a planned order. Call only once the matching command is queued.
    pub fn commit_order(&mut self, order: ChainOrder) {
        self.order = order;
    }

    pub fn commit_settings(&mut self, settings: EffectSettings) {
        self.settings[settings.kind().index()] = settings;
    }
}

/// One render-side chain mutation.
pub enum ChainEdit {
    Insert {
        module: Box<dyn EffectModule>,
        order: ChainOrder,
    },
    Remove {
        kind: EffectKind,
        order: ChainOrder,
    },
    Reorder {
        order: ChainOrder,
    },
    Clear,
    SetParam {
        kind: EffectKind,
        param: EffectParam,
        value: f32,
    },
}

impl std::fmt::Debug for ChainEdit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainEdit::Insert { module, order } => f
                .debug_struct("Insert")
                .field("kind", &module.kind())
                .field("order", order)
                .finish(),
            ChainEdit::Remove { kind, order } => f
                .debug_struct("Remove")
                .field("kind", kind)
                .field("order", order)
                .finish(),
            ChainEdit::Reorder { order } => {
                f.debug_struct("Reorder").field("order", order).finish()
            }
            ChainEdit::Clear => f.write_str("Clear"),
            ChainEdit::SetParam { kind, param, value } => f
                .debug_struct("SetParam")
                .field("kind", kind)
                .field("param", param)
                .field("value", value)
                .finish(),
        }
    }
}

pub type RetiredModules = Producer<Box<dyn EffectModule>>;

/// Render-side chain: live modules in order, then the limiter.
pub struct ChainRunner {
    // Indexed by EffectKind::index(); allocated once
    slots: Vec<Option<Box<dyn EffectModule>>>,
    order: ChainOrder,
    limiter: Limiter,
    retired: RetiredModules,
}

impl ChainRunner {
    pub fn new(limiter: Limiter, retired: RetiredModules) -> Self {
        Self {
            slots: (0..EffectKind::COUNT).map(|_| None).collect(),
            order: ChainOrder::new(),
            limiter,
            retired,
        }
    }

    /// Apply one edit. Never allocates or frees.
    pub fn apply(&mut self, edit: ChainEdit) {
        match edit {
            ChainEdit::Insert { module, order } => {
                let index = module.kind().index();
                if let Some(previous) = self.slots[index].replace(module) {
                    retire(&mut self.retired, previous);
                }
                self.set_order(order);
            }
            ChainEdit::Remove { kind, order } => {
                if let Some(module) = self.slots[kind.index()].take() {
                    retire(&mut self.retired, module);
                }
                self.set_order(order);
            }
            ChainEdit::Reorder { order } => self.set_order(order),
            ChainEdit::Clear => self.set_order(ChainOrder::new()),
            ChainEdit::SetParam { kind, param, value } => {
                if let Some(module) = self.slots[kind.index()].as_mut() {
                    module.set_param(param, value);
                }
            }
        }
    }

    fn set_order(&mut self, order: ChainOrder) {
        self.order = order;
        // Anything the new order no longer names is detached
        for kind in EffectKind::iter() {
            if !order.contains(kind) {
                if let Some(module) = self.slots[kind.index()].take() {
                    retire(&mut self.retired, module);
                }
            }
        }
    }

    /// Run the block through every effect in order, then the sink.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32], ctx: &RenderCtx) {
        for kind in self.order.iter() {
            if let Some(module) = self.slots[kind.index()].as_mut() {
                module.process(left, right, ctx);
            }
        }
        self.limiter.process(left, right);
    }

    /// Clear every live module's tail. The order is kept.
    pub fn reset(&mut self) {
        for module in self.slots.iter_mut().flatten() {
            module.reset();
        }
    }

    pub fn order(&self) -> ChainOrder {
        self.order
    }

    pub fn stages(&self) -> impl Iterator<Item = Stage> + '_ {
        self.order.stages()
    }

    pub fn module(&self, kind: EffectKind) -> Option<&dyn EffectModule> {
        self.slots[kind.index()].as_deref()
    }
}

fn retire(retired: &mut RetiredModules, module: Box<dyn EffectModule>) {
    // Return queue full: drop in place
    if let Err(PushError::Full(module)) = retired.push(module) {
        drop(module);
    }
}

#[cfg(test)]
mod tests {
    use rtrb::{Consumer, RingBuffer};

    use super::*;
    use crate::{dsp::limiter::DEFAULT_CEILING, effects::build};

    const SR: f32 = 48_000.0;

    fn runner() -> (ChainRunner, Consumer<Box<dyn EffectModule>>) {
        let (tx, rx) = RingBuffer::new(EffectKind::COUNT);
        (ChainRunner::new(Limiter::new(DEFAULT_CEILING, SR), tx), rx)
    }

    fn insert(layout: &mut ChainLayout, runner: &mut ChainRunner, kind: EffectKind) {
        let order = layout.plan_add(kind).expect("kind not yet in chain");
        let module = build(layout.settings(kind), SR);
        runner.apply(ChainEdit::Insert { module, order });
        layout.commit_order(order);
    }

    fn assert_well_formed(stages: &[Stage]) {
        assert_eq!(stages.first(), Some(&Stage::Source));
        assert_eq!(stages.last(), Some(&Stage::Sink));
        let effects: Vec<_> = stages[1..stages.len() - 1].to_vec();
        assert!(effects.iter().all(|s| matches!(s, Stage::Effect(_))));
        for (i, a) in effects.iter().enumerate() {
            assert!(!effects[i + 1..].contains(a), "duplicate {a:?}");
        }
    }

    #[test]
    fn empty_chain_is_source_then_sink() {
        let layout = ChainLayout::new();
        assert_eq!(layout.stages(), vec![Stage::Source, Stage::Sink]);
    }

    #[test]
    fn duplicate_add_is_refused() {
        let mut order = ChainOrder::new();
        assert!(order.push(EffectKind::Lowpass));
        assert!(!order.push(EffectKind::Lowpass));
        assert_eq!(order.len(), 1);
    }

    #[test]
    fn remove_and_move_keep_relative_order() {
        let mut order = ChainOrder::new();
        for kind in [
            EffectKind::Lowpass,
            EffectKind::Delay,
            EffectKind::Reverb,
            EffectKind::Chorus,
        ] {
            order.push(kind);
        }
        assert!(order.remove(EffectKind::Delay));
        assert!(!order.remove(EffectKind::Delay));
        assert_eq!(
            order.iter().collect::<Vec<_>>(),
            vec![EffectKind::Lowpass, EffectKind::Reverb, EffectKind::Chorus]
        );

        assert!(order.move_to(EffectKind::Chorus, 0));
        assert_eq!(
            order.iter().collect::<Vec<_>>(),
            vec![EffectKind::Chorus, EffectKind::Lowpass, EffectKind::Reverb]
        );
        assert!(order.move_to(EffectKind::Chorus, 99));
        assert_eq!(order.position(EffectKind::Chorus), Some(2));
        assert!(!order.move_to(EffectKind::Chorus, 2));
    }

    #[test]
    fn runner_follows_every_edit_and_hands_back_modules() {
        let mut layout = ChainLayout::new();
        let (mut runner, mut retired) = runner();

        insert(&mut layout, &mut runner, EffectKind::Highpass);
        insert(&mut layout, &mut runner, EffectKind::Delay);
        insert(&mut layout, &mut runner, EffectKind::Reverb);
        assert_eq!(runner.order(), layout.order());
        assert_well_formed(&runner.stages().collect::<Vec<_>>());

        let order = layout.plan_remove(EffectKind::Delay).expect("delay is present");
        runner.apply(ChainEdit::Remove {
            kind: EffectKind::Delay,
            order,
        });
        layout.commit_order(order);

        let detached = retired.pop().expect("removed module comes back");
        assert_eq!(detached.kind(), EffectKind::Delay);
        assert!(runner.module(EffectKind::Delay).is_none());
        assert_eq!(runner.order(), layout.order());

        runner.apply(ChainEdit::Clear);
        assert_eq!(retired.slots(), 2);
        assert_eq!(runner.stages().collect::<Vec<_>>(), vec![Stage::Source, Stage::Sink]);
    }

    #[test]
    fn set_param_reaches_live_module_only() {
        let mut layout = ChainLayout::new();
        let (mut runner, _retired) = runner();
        insert(&mut layout, &mut runner, EffectKind::Lowpass);

        runner.apply(ChainEdit::SetParam {
            kind: EffectKind::Lowpass,
            param: EffectParam::Cutoff,
            value: 800.0,
        });
        runner.apply(ChainEdit::SetParam {
            kind: EffectKind::Reverb,
            param: EffectParam::Mix,
            value: 1.0,
        });

        let module = runner.module(EffectKind::Lowpass).expect("lowpass is live");
        assert_eq!(module.param(EffectParam::Cutoff), Some(800.0));
        assert!(runner.module(EffectKind::Reverb).is_none());
    }

    #[test]
    fn sink_bounds_whatever_the_chain_produces() {
        let mut layout = ChainLayout::new();
        let (mut runner, _retired) = runner();
        insert(&mut layout, &mut runner, EffectKind::Distortion);

        let mut left = vec![5.0; 256];
        let mut right = vec![f32::NAN; 256];
        runner.process(&mut left, &mut right, &RenderCtx::effect(SR));
        assert!(left
            .iter()
            .chain(&right)
            .all(|s| s.is_finite() && s.abs() <= DEFAULT_CEILING));
    }

    #[test]
    fn planned_update_leaves_layout_untouched() {
        let layout = ChainLayout::new();
        let next = layout
            .plan_update(EffectKind::Delay, EffectParam::Time, 0.5)
            .expect("delay accepts time");
        assert_eq!(next.get(EffectParam::Time), Some(0.5));
        assert_eq!(
            layout.settings(EffectKind::Delay).get(EffectParam::Time),
            Some(0.25)
        );
        assert!(layout
            .plan_update(EffectKind::Delay, EffectParam::Cutoff, 1.0)
            .is_err());
    }
}
