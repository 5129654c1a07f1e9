use serde::{Deserialize, Serialize};

/// Values that can be interpolated between keyframes.
///
/// Scalars blend arithmetically, vectors component-wise. `delta_mag` is the
/// magnitude of the value change across a keyframe pair, used to normalize
/// ease speeds against the pair's average rate of change.
pub trait Blend: Clone {
    /// Linear blend `a + (b - a) * t`.
    fn blend(a: &Self, b: &Self, t: f64) -> Self;
    /// Magnitude of `b - a`.
    fn delta_mag(a: &Self, b: &Self) -> f64;
}

impl Blend for f64 {
    fn blend(a: &Self, b: &Self, t: f64) -> Self {
        a + (b - a) * t
    }

    fn delta_mag(a: &Self, b: &Self) -> f64 {
        (b - a).abs()
    }
}

impl Blend for Vec<f64> {
    fn blend(a: &Self, b: &Self, t: f64) -> Self {
        // Components missing from `b` hold a's value.
        a.iter()
            .enumerate()
            .map(|(i, v)| match b.get(i) {
                Some(w) => v + (w - v) * t,
                None => *v,
            })
            .collect()
    }

    fn delta_mag(a: &Self, b: &Self) -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(v, w)| (w - v) * (w - v))
            .sum::<f64>()
            .sqrt()
    }
}

/// Keyframe interpolation mode as exported by the authoring tool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InterpMode {
    /// Straight-line interpolation toward the neighbor key.
    #[default]
    Linear,
    /// Eased interpolation described by speed/influence handles.
    Bezier,
    /// Hold mode as exported; sampled linearly like every non-eased mode.
    Hold,
    /// Any mode this engine does not recognize; treated as linear.
    #[serde(other)]
    Unknown,
}

/// Ease handle: tangent steepness (`speed`, value units per second) and
/// temporal reach (`influence`, percent of the key span).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EaseHandle {
    /// Curve speed at the keyframe in value units per second.
    #[serde(default)]
    pub speed: f64,
    /// Temporal influence of the handle as a percentage of the span.
    #[serde(default)]
    pub influence: f64,
}

/// A single `(time, value)` sample with easing metadata.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keyframe<T> {
    /// Keyframe time in composition seconds.
    pub time: f64,
    /// Sampled value at this time.
    pub value: T,
    /// Interpolation mode arriving at this key.
    #[serde(default)]
    pub in_interp: InterpMode,
    /// Interpolation mode leaving this key.
    #[serde(default)]
    pub out_interp: InterpMode,
    /// Incoming ease handles (per-dimension; the first entry is used).
    #[serde(default)]
    pub ease_in: Vec<EaseHandle>,
    /// Outgoing ease handles (per-dimension; the first entry is used).
    #[serde(default)]
    pub ease_out: Vec<EaseHandle>,
}

/// A static or keyframed animated property.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Property<T> {
    /// Single static value, taking precedence over keys when present.
    #[serde(rename = "static", default, skip_serializing_if = "Option::is_none")]
    pub static_value: Option<T>,
    /// Ordered keyframe list.
    #[serde(default = "Vec::new", skip_serializing_if = "Vec::is_empty")]
    pub keys: Vec<Keyframe<T>>,
}

impl<T> Property<T> {
    /// Build a static property.
    pub fn fixed(value: T) -> Self {
        Self {
            static_value: Some(value),
            keys: Vec::new(),
        }
    }
}

impl<T: Blend> Property<T> {
    /// Sample the property at time `t` (composition seconds).
    ///
    /// Pure function of `(self, t)`: static value wins, otherwise values
    /// clamp to the first/last key outside the keyed range and interpolate
    /// inside it. Returns `None` when the property has no data at all.
    pub fn value_at(&self, t: f64) -> Option<T> {
        if let Some(v) = &self.static_value {
            return Some(v.clone());
        }
        let first = self.keys.first()?;
        if t <= first.time {
            return Some(first.value.clone());
        }
        let last = self.keys.last()?;
        if t >= last.time {
            return Some(last.value.clone());
        }

        let idx = self.keys.partition_point(|k| k.time <= t);
        // `t` is strictly inside (first.time, last.time), so both sides exist.
        let a = self.keys.get(idx.checked_sub(1)?)?;
        let b = self.keys.get(idx)?;

        let span = b.time - a.time;
        let span = if span == 0.0 { 1.0 } else { span };
        let raw = (t - a.time) / span;

        let eased = if needs_ease(a, b) {
            eased_progress(a, b, raw)
        } else {
            raw
        };

        Some(T::blend(&a.value, &b.value, eased))
    }
}

fn needs_ease<T>(a: &Keyframe<T>, b: &Keyframe<T>) -> bool {
    a.out_interp == InterpMode::Bezier
        || b.in_interp == InterpMode::Bezier
        || !a.ease_out.is_empty()
        || !b.ease_in.is_empty()
}

/// Reconstruct the easing curve between `a` and `b` and evaluate it at the
/// raw progress `t` in `[0, 1]`.
fn eased_progress<T: Blend>(a: &Keyframe<T>, b: &Keyframe<T>, t: f64) -> f64 {
    let span = (b.time - a.time).max(f64::EPSILON);
    // Speed is expressed relative to the pair's average rate of change.
    let avg_speed = T::delta_mag(&a.value, &b.value) / span;

    let out = a.ease_out.first().copied().unwrap_or_default();
    let inn = b.ease_in.first().copied().unwrap_or_default();

    let x1 = (out.influence / 100.0).clamp(0.0, 1.0);
    let x2 = 1.0 - (inn.influence / 100.0).clamp(0.0, 1.0);
    let (y1, y2) = if avg_speed > 0.0 {
        (
            x1 * out.speed / avg_speed,
            1.0 - (1.0 - x2) * inn.speed / avg_speed,
        )
    } else {
        // Constant-value pair: the curve shape cannot affect the result.
        (x1, x2)
    };

    cubic_bezier_y(t, x1, y1, x2, y2)
}

/// Solve the cubic bezier `(0,0) (x1,y1) (x2,y2) (1,1)` for the parameter
/// whose x equals `x`, then evaluate y there.
///
/// A short Newton iteration does the bulk of the work; a bisection pass
/// refines it so non-monotonic x handles still land within ~1e-3.
fn cubic_bezier_y(x: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    const NEWTON_STEPS: usize = 5;
    const BISECT_STEPS: usize = 8;

    let x = x.clamp(0.0, 1.0);
    if (x1 - y1).abs() < f64::EPSILON && (x2 - y2).abs() < f64::EPSILON {
        // Control points on the diagonal: the curve is the identity.
        return x;
    }
    let sample_x = |s: f64| bezier_component(s, x1, x2);
    let sample_dx = |s: f64| bezier_derivative(s, x1, x2);

    let mut s = x;
    for _ in 0..NEWTON_STEPS {
        let d = sample_dx(s);
        if d.abs() < 1e-6 {
            break;
        }
        s -= (sample_x(s) - x) / d;
        s = s.clamp(0.0, 1.0);
    }

    if (sample_x(s) - x).abs() > 1e-4 {
        let mut lo = 0.0f64;
        let mut hi = 1.0f64;
        for _ in 0..BISECT_STEPS {
            s = (lo + hi) / 2.0;
            if sample_x(s) < x {
                lo = s;
            } else {
                hi = s;
            }
        }
    }

    bezier_component(s, y1, y2)
}

fn bezier_component(s: f64, p1: f64, p2: f64) -> f64 {
    let u = 1.0 - s;
    3.0 * u * u * s * p1 + 3.0 * u * s * s * p2 + s * s * s
}

fn bezier_derivative(s: f64, p1: f64, p2: f64) -> f64 {
    let u = 1.0 - s;
    3.0 * u * u * p1 + 6.0 * u * s * (p2 - p1) + 3.0 * s * s * (1.0 - p2)
}

/// A possibly "separated" multi-dimensional property: either one vector
/// track or independently keyframed per-axis scalar tracks assembled into a
/// vector on read.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DimProperty {
    /// Independently keyframed components.
    Separated(SeparatedProperty),
    /// Single vector-valued track.
    Plain(Property<Vec<f64>>),
}

/// Per-axis component tracks of a separated property.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SeparatedProperty {
    /// Marker set by the exporter.
    pub separated: bool,
    /// Ordered axis tracks (x, y, ...).
    pub components: Vec<PropertyComponent>,
}

/// One named axis track of a separated property.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PropertyComponent {
    /// Axis name as exported (e.g. "X Position").
    pub name: String,
    /// Scalar track for this axis.
    pub value: Property<f64>,
}

impl DimProperty {
    /// Sample the vector value at time `t`, evaluating each separated axis
    /// with the same algorithm as a plain track.
    pub fn value_at(&self, t: f64) -> Option<Vec<f64>> {
        match self {
            Self::Plain(p) => p.value_at(t),
            Self::Separated(s) => Some(
                s.components
                    .iter()
                    .map(|c| c.value.value_at(t).unwrap_or(0.0))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/document/property.rs"]
mod tests;
