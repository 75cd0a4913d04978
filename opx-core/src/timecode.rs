use crate::error::{OpxError, Result};
use std::fmt;

/// SMPTE `HH:MM:SS:FF` timecode with optional drop-frame compensation.
///
/// `frame_number()` and [`Timecode::from_frame_number`] are exact inverses
/// of one another over the set of timecodes that `next()` can ever produce;
/// the underlying arithmetic is defined (and tested) for every syntactic
/// `(h, m, s, f)` tuple, reachable or not, since restriping and scanning
/// logic needs to reason about raw frame offsets without first proving
/// reachability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timecode {
    hours: u8,
    minutes: u8,
    seconds: u8,
    frames: u32,
    timebase: u32,
    drop_frame: bool,
}

/// Number of frame *labels* skipped at the start of every droppable minute.
/// 2 for 29.97fps-class streams (nominal timebase 30), 4 for 59.94fps-class
/// streams (nominal timebase 60).
fn drop_count(timebase: u32) -> u32 {
    if timebase >= 50 {
        4
    } else {
        2
    }
}

impl Timecode {
    pub fn new(
        hours: u8,
        minutes: u8,
        seconds: u8,
        frames: u32,
        timebase: u32,
        drop_frame: bool,
    ) -> Result<Self> {
        if hours >= 24 || minutes >= 60 || seconds >= 60 || frames >= timebase {
            return Err(OpxError::structural(format!(
                "timecode {hours:02}:{minutes:02}:{seconds:02}:{frames:02} out of range for timebase {timebase}"
            )));
        }
        if drop_frame && minutes % 10 != 0 && frames < drop_count(timebase) {
            return Err(OpxError::structural(format!(
                "timecode {hours:02}:{minutes:02}:{seconds:02}:{frames:02} names a dropped frame label"
            )));
        }
        Ok(Timecode {
            hours,
            minutes,
            seconds,
            frames,
            timebase,
            drop_frame,
        })
    }

    pub fn zero(timebase: u32, drop_frame: bool) -> Self {
        Timecode {
            hours: 0,
            minutes: 0,
            seconds: 0,
            frames: 0,
            timebase,
            drop_frame,
        }
    }

    pub fn hours(&self) -> u8 {
        self.hours
    }

    pub fn minutes(&self) -> u8 {
        self.minutes
    }

    pub fn seconds(&self) -> u8 {
        self.seconds
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    pub fn timebase(&self) -> u32 {
        self.timebase
    }

    pub fn is_drop_frame(&self) -> bool {
        self.drop_frame
    }

    /// Raw frame offset within one 24-hour day. See the struct docs for the
    /// relationship between this and [`Timecode::from_frame_number`].
    pub fn frame_number(&self) -> u64 {
        let timebase = self.timebase as u64;
        let mut raw = timebase * 3600 * self.hours as u64
            + timebase * 60 * self.minutes as u64
            + timebase * self.seconds as u64
            + self.frames as u64;
        if self.drop_frame {
            let total_minutes = 60 * self.hours as u64 + self.minutes as u64;
            let drop = drop_count(self.timebase) as u64;
            raw -= drop * (total_minutes - total_minutes / 10);
        }
        raw
    }

    /// Builds the timecode that `frame_number` frames (mod one day) names.
    pub fn from_frame_number(frame_number: u64, timebase: u32, drop_frame: bool) -> Self {
        let frames_per_day = timebase as u64 * 86400;
        let n = frame_number % frames_per_day;
        let frames_per_minute = timebase as u64 * 60;

        let (total_minutes, within_minute) = if drop_frame {
            let drop = drop_count(timebase) as u64;
            let frames_per_10min_block = frames_per_minute * 10 - drop * 9;
            let block = n / frames_per_10min_block;
            let rem = n % frames_per_10min_block;

            if rem < frames_per_minute {
                (block * 10, rem)
            } else {
                let frames_per_nondecade_minute = frames_per_minute - drop;
                let rem2 = rem - frames_per_minute;
                let minute_in_block = 1 + rem2 / frames_per_nondecade_minute;
                let r = rem2 % frames_per_nondecade_minute + drop;
                (block * 10 + minute_in_block, r)
            }
        } else {
            (n / frames_per_minute, n % frames_per_minute)
        };

        let seconds = within_minute / timebase as u64;
        let frames = within_minute % timebase as u64;
        let minutes = total_minutes % 60;
        let hours = (total_minutes / 60) % 24;

        Timecode {
            hours: hours as u8,
            minutes: minutes as u8,
            seconds: seconds as u8,
            frames: frames as u32,
            timebase,
            drop_frame,
        }
    }

    /// Advances by one frame, wrapping 24:00:00:00 to 00:00:00:00 and
    /// skipping dropped frame labels at the start of non-decade minutes.
    pub fn next(&self) -> Self {
        let mut frames = self.frames + 1;
        let mut seconds = self.seconds;
        let mut minutes = self.minutes;
        let mut hours = self.hours;

        if frames >= self.timebase {
            frames = 0;
            seconds += 1;
            if seconds >= 60 {
                seconds = 0;
                minutes += 1;
                if minutes >= 60 {
                    minutes = 0;
                    hours += 1;
                    if hours >= 24 {
                        hours = 0;
                    }
                }
                if self.drop_frame && minutes % 10 != 0 {
                    frames = drop_count(self.timebase);
                }
            }
        }

        Timecode {
            hours,
            minutes,
            seconds,
            frames,
            timebase: self.timebase,
            drop_frame: self.drop_frame,
        }
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = if self.drop_frame { ';' } else { ':' };
        write!(
            f,
            "{:02}:{:02}:{:02}{}{:02}",
            self.hours, self.minutes, self.seconds, sep, self.frames
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_drop_round_trip() {
        let tc = Timecode::new(1, 2, 3, 4, 25, false).unwrap();
        assert_eq!(Timecode::from_frame_number(tc.frame_number(), 25, false), tc);
    }

    #[test]
    fn drop_frame_round_trip_across_decade_boundary() {
        for m in 0..60u8 {
            if m % 10 == 0 {
                continue;
            }
            let tc = Timecode::new(0, m, 0, 2, 30, true).unwrap();
            assert_eq!(
                Timecode::from_frame_number(tc.frame_number(), 30, true),
                tc,
                "round-trip failed at minute {m}"
            );
        }
    }

    #[test]
    fn drop_frame_decade_minute_label_is_valid_at_frame_zero() {
        let tc = Timecode::new(0, 10, 0, 0, 30, true).unwrap();
        assert_eq!(Timecode::from_frame_number(tc.frame_number(), 30, true), tc);
    }

    #[test]
    fn drop_frame_rejects_skipped_labels() {
        assert!(Timecode::new(0, 1, 0, 0, 30, true).is_err());
        assert!(Timecode::new(0, 1, 0, 1, 30, true).is_err());
        assert!(Timecode::new(0, 1, 0, 2, 30, true).is_ok());
    }

    #[test]
    fn published_ndf_frame_numbers_at_minute_boundaries() {
        // Property 4: frame number at exactly MM:00:00 (drop-frame, 30fps).
        for minute in 1u64..60 {
            let expected = if minute % 10 == 0 {
                // decade minutes: 17982, 35964, ...
                1798 * minute + 2 * (minute / 10)
            } else {
                1800 + (minute - 1) * 1798
            };
            let frames = if minute % 10 == 0 { 0 } else { 2 };
            let tc = Timecode::new(0, minute as u8, 0, frames, 30, true).unwrap();
            assert_eq!(tc.frame_number(), expected, "minute {minute}");
        }
    }

    #[test]
    fn next_wraps_at_midnight() {
        let tc = Timecode::new(23, 59, 59, 24, 25, false).unwrap();
        assert_eq!(tc.next(), Timecode::zero(25, false));
    }

    #[test]
    fn next_skips_dropped_labels_entering_non_decade_minute() {
        let tc = Timecode::new(0, 0, 59, 29, 30, true).unwrap();
        let next = tc.next();
        assert_eq!(next.minutes(), 1);
        assert_eq!(next.seconds(), 0);
        assert_eq!(next.frames(), 2);
    }

    #[test]
    fn next_does_not_skip_entering_decade_minute() {
        let tc = Timecode::new(0, 8, 59, 29, 30, true).unwrap();
        let next = tc.next();
        assert_eq!(next.minutes(), 9);
        assert_eq!(next.frames(), 2);

        let tc2 = Timecode::new(0, 9, 59, 29, 30, true).unwrap();
        let next2 = tc2.next();
        assert_eq!(next2.minutes(), 10);
        assert_eq!(next2.frames(), 0);
    }

    #[test]
    fn display_uses_semicolon_for_drop_frame() {
        let tc = Timecode::new(1, 2, 3, 4, 30, true).unwrap();
        assert_eq!(tc.to_string(), "01:02:03;04");
        let ndf = Timecode::new(1, 2, 3, 4, 25, false).unwrap();
        assert_eq!(ndf.to_string(), "01:02:03:04");
    }
}
