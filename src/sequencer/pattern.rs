// Pattern - Fixed 16-step drum grids, one per phase
// Three variants rotate with the phase number

use super::timeline::STEPS_PER_BAR;

const STEPS: usize = STEPS_PER_BAR as usize;

/// General MIDI percussion keys used by the drum voice
pub mod drum_key {
    pub const KICK: u8 = 36;
    pub const SNARE: u8 = 38;
    pub const CLOSED_HAT: u8 = 42;
    pub const OPEN_HAT: u8 = 46;
    pub const CRASH: u8 = 49;
}

/// Velocity of the crash accent at phase boundaries
pub const CRASH_VELOCITY: u8 = 110;

/// Groove selected by `phase % 3`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrumVariant {
    /// Kick on 1 and 3, snare on 2 and 4, eighth-note hats
    Backbeat,
    /// Kick on 1, 2-and and 4, snare on 2 and 3-and, quarter hats
    Syncopated,
    /// Kick on 1 and 3, a single snare on 3, quarter hats
    HalfTime,
}

impl DrumVariant {
    pub fn for_phase(phase: usize) -> Self {
        match phase % 3 {
            0 => DrumVariant::Backbeat,
            1 => DrumVariant::Syncopated,
            _ => DrumVariant::HalfTime,
        }
    }
}

/// One drum hit produced by a pattern step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrumHit {
    pub key: u8,
    pub velocity: u8,
}

/// A bar of kick, snare and hi-hat on a 16th-note grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrumPattern {
    pub variant: DrumVariant,
    pub kick: [bool; STEPS],
    pub snare: [bool; STEPS],
    pub hihat: [bool; STEPS],
    pub velocities: [u8; STEPS],
}

impl DrumPattern {
    /// Build the pattern for a phase
    pub fn for_phase(phase: usize) -> Self {
        Self::from_variant(DrumVariant::for_phase(phase))
    }

    pub fn from_variant(variant: DrumVariant) -> Self {
        let mut pattern = Self {
            variant,
            kick: [false; STEPS],
            snare: [false; STEPS],
            hihat: [false; STEPS],
            velocities: [0; STEPS],
        };

        let (kicks, snares, hats): (&[usize], &[usize], &[usize]) = match variant {
            DrumVariant::Backbeat => (&[0, 8], &[4, 12], &[0, 2, 4, 6, 8, 10, 12, 14]),
            DrumVariant::Syncopated => (&[0, 6, 12], &[4, 10], &[0, 4, 8, 12]),
            DrumVariant::HalfTime => (&[0, 8], &[8], &[0, 4, 8, 12]),
        };
        for &step in kicks {
            pattern.kick[step] = true;
        }
        for &step in snares {
            pattern.snare[step] = true;
        }
        for &step in hats {
            pattern.hihat[step] = true;
        }

        for (step, velocity) in pattern.velocities.iter_mut().enumerate() {
            *velocity = accent_velocity(step);
        }

        pattern
    }

    /// Hits sounding on `step` (taken modulo 16), kick first
    pub fn hits_at(&self, step: usize) -> Vec<DrumHit> {
        let step = step % STEPS;
        let velocity = self.velocities[step];
        let mut hits = Vec::with_capacity(3);

        if self.kick[step] {
            hits.push(DrumHit {
                key: drum_key::KICK,
                velocity,
            });
        }
        if self.snare[step] {
            hits.push(DrumHit {
                key: drum_key::SNARE,
                velocity,
            });
        }
        if self.hihat[step] {
            // Open hat on the half-bar downbeats
            let key = if step % 8 == 0 {
                drum_key::OPEN_HAT
            } else {
                drum_key::CLOSED_HAT
            };
            hits.push(DrumHit { key, velocity });
        }

        hits
    }
}

/// Strong on quarter notes, medium on eighths, soft otherwise
fn accent_velocity(step: usize) -> u8 {
    if step % 4 == 0 {
        110
    } else if step % 2 == 0 {
        90
    } else {
        70
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps(grid: &[bool; STEPS]) -> Vec<usize> {
        grid.iter()
            .enumerate()
            .filter(|(_, on)| **on)
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn test_variant_rotation() {
        assert_eq!(DrumVariant::for_phase(0), DrumVariant::Backbeat);
        assert_eq!(DrumVariant::for_phase(1), DrumVariant::Syncopated);
        assert_eq!(DrumVariant::for_phase(2), DrumVariant::HalfTime);
        assert_eq!(DrumVariant::for_phase(3), DrumVariant::Backbeat);
    }

    #[test]
    fn test_backbeat_grid() {
        let p = DrumPattern::for_phase(0);
        assert_eq!(steps(&p.kick), vec![0, 8]);
        assert_eq!(steps(&p.snare), vec![4, 12]);
        assert_eq!(steps(&p.hihat), vec![0, 2, 4, 6, 8, 10, 12, 14]);
    }

    #[test]
    fn test_syncopated_grid() {
        let p = DrumPattern::for_phase(1);
        assert_eq!(steps(&p.kick), vec![0, 6, 12]);
        assert_eq!(steps(&p.snare), vec![4, 10]);
        assert_eq!(steps(&p.hihat), vec![0, 4, 8, 12]);
    }

    #[test]
    fn test_half_time_grid() {
        let p = DrumPattern::for_phase(5);
        assert_eq!(p.variant, DrumVariant::HalfTime);
        assert_eq!(steps(&p.kick), vec![0, 8]);
        assert_eq!(steps(&p.snare), vec![8]);
        assert_eq!(steps(&p.hihat), vec![0, 4, 8, 12]);
    }

    #[test]
    fn test_accent_velocities() {
        let p = DrumPattern::for_phase(0);
        assert_eq!(p.velocities[0], 110);
        assert_eq!(p.velocities[4], 110);
        assert_eq!(p.velocities[2], 90);
        assert_eq!(p.velocities[7], 70);
    }

    #[test]
    fn test_hits_use_open_hat_on_half_bar() {
        let p = DrumPattern::for_phase(0);

        let downbeat = p.hits_at(0);
        assert_eq!(
            downbeat,
            vec![
                DrumHit { key: drum_key::KICK, velocity: 110 },
                DrumHit { key: drum_key::OPEN_HAT, velocity: 110 },
            ]
        );

        let offbeat = p.hits_at(2);
        assert_eq!(offbeat, vec![DrumHit { key: drum_key::CLOSED_HAT, velocity: 90 }]);

        assert!(p.hits_at(3).is_empty());
        // Steps past the bar wrap around
        assert_eq!(p.hits_at(16), downbeat);
    }
}
