use parking_lot::Mutex;

use crate::stream::Channel;

struct LastTouched {
    channel: Option<Channel>,
    flushing_last: bool,
}

static LAST_TOUCHED: Mutex<LastTouched> = parking_lot::const_mutex(LastTouched {
    channel: None,
    flushing_last: false,
});

/// Keeps interleaved channels in chronological order.
///
/// Before a redirected buffer accepts or emits text, whatever the previously
/// touched channel still holds is flushed, so it lands in the file first.
#[derive(Debug)]
pub(crate) struct Flusher {
    channels: Vec<Channel>,
}

impl Flusher {
    pub(crate) fn new(channels: &[Channel]) -> Flusher {
        Flusher {
            channels: channels.to_vec(),
        }
    }

    pub(crate) fn flush_last_if_needed(&self) {
        let Some(&current) = self.channels.first() else {
            return;
        };
        let last = {
            let mut state = LAST_TOUCHED.lock();
            if state.flushing_last {
                return;
            }
            let last = state.channel.replace(current);
            match last {
                Some(last) if !self.channels.contains(&last) => {
                    state.flushing_last = true;
                    last
                }
                _ => return,
            }
        };
        let _flushing = FlushingLast;
        // A failure here is reported by the flushed channel's own buffer.
        let _ = last.stream().flush();
    }
}

struct FlushingLast;

impl Drop for FlushingLast {
    fn drop(&mut self) {
        LAST_TOUCHED.lock().flushing_last = false;
    }
}
