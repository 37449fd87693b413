use std::fmt;

/// One scalar component of a folded constant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstantUnion {
    Float(f32),
    Int(i32),
    UInt(u32),
    Bool(bool),
}

impl ConstantUnion {
    pub fn as_i64(self) -> Option<i64> {
        match self {
            ConstantUnion::Int(v) => Some(i64::from(v)),
            ConstantUnion::UInt(v) => Some(i64::from(v)),
            _ => None,
        }
    }

    pub fn as_f32(self) -> f32 {
        match self {
            ConstantUnion::Float(v) => v,
            ConstantUnion::Int(v) => v as f32,
            ConstantUnion::UInt(v) => v as f32,
            ConstantUnion::Bool(v) => {
                if v {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

impl fmt::Display for ConstantUnion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ConstantUnion::Float(v) => {
                // Values outside the float range are not representable in GLSL source.
                let v = v.clamp(-f32::MAX, f32::MAX);
                if v.fract() == 0.0 && v.abs() < 1e16 {
                    write!(f, "{v:.1}")
                } else {
                    write!(f, "{v:?}")
                }
            }
            ConstantUnion::Int(v) => write!(f, "{v}"),
            ConstantUnion::UInt(v) => write!(f, "{v}u"),
            ConstantUnion::Bool(v) => write!(f, "{v}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ConstantUnion;

    #[test]
    fn floats_always_carry_a_decimal_point() {
        assert_eq!(ConstantUnion::Float(1.0).to_string(), "1.0");
        assert_eq!(ConstantUnion::Float(-0.5).to_string(), "-0.5");
        assert_eq!(ConstantUnion::Int(-3).to_string(), "-3");
        assert_eq!(ConstantUnion::UInt(7).to_string(), "7u");
        assert_eq!(ConstantUnion::Bool(true).to_string(), "true");
    }

    #[test]
    fn infinities_are_clamped() {
        let s = ConstantUnion::Float(f32::INFINITY).to_string();
        assert_eq!(s.parse::<f32>().ok(), Some(f32::MAX));
    }
}
