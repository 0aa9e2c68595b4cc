use serde::{Deserialize, Serialize};

use crate::types::{EventType, TraceEvent};

/// The sequence-number interval during which one agent was active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSpan {
    pub agent_name: String,
    pub start_seq: u64,
    pub end_seq: u64,
}

impl AgentSpan {
    pub fn contains(&self, seq: u64) -> bool {
        seq >= self.start_seq && seq <= self.end_seq
    }
}

/// Ordered, non-overlapping agent spans built from start/end markers.
///
/// Powers re-attribution of memory and knowledge events whose emitted agent
/// name is unreliable: the owning span is the one containing the event's
/// sequence number, or failing that the nearest span by sequence distance.
#[derive(Debug, Clone, Default)]
pub struct SpanIndex {
    spans: Vec<AgentSpan>,
}

impl SpanIndex {
    /// Build spans from matched `AgentStart`/`AgentEnd` pairs in event order.
    ///
    /// Ends pair with the first pending start of the same agent name. A
    /// start that never sees its end yields an open span extending to the
    /// maximum observed sequence number.
    pub fn build(events: &[TraceEvent]) -> Self {
        let max_seq = events.iter().map(|e| e.sequence_num).max().unwrap_or(0);

        let mut pending: Vec<(String, u64)> = Vec::new();
        let mut spans: Vec<AgentSpan> = Vec::new();

        for event in events {
            let Some(name) = event.agent_name.as_deref() else {
                continue;
            };
            match event.event_type {
                EventType::AgentStart => {
                    pending.push((name.to_string(), event.sequence_num));
                }
                EventType::AgentEnd => {
                    if let Some(pos) = pending.iter().position(|(n, _)| n == name) {
                        let (agent_name, start_seq) = pending.remove(pos);
                        spans.push(AgentSpan {
                            agent_name,
                            start_seq,
                            end_seq: event.sequence_num,
                        });
                    }
                }
                _ => {}
            }
        }

        for (agent_name, start_seq) in pending {
            spans.push(AgentSpan {
                agent_name,
                start_seq,
                end_seq: max_seq,
            });
        }

        spans.sort_by_key(|s| s.start_seq);

        Self { spans }
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn spans(&self) -> &[AgentSpan] {
        &self.spans
    }

    /// Attribute a sequence number to an agent.
    ///
    /// A sequence number inside a span (inclusive on both ends) belongs to
    /// that span's agent. Outside every span, the nearest span by absolute
    /// sequence distance wins; when the distance to a following span exactly
    /// equals the distance to a preceding span, the following span wins.
    /// Returns `None` only when no spans exist.
    ///
    /// Total and deterministic: same inputs, same answer, every time.
    pub fn attribute(&self, seq: u64) -> Option<&str> {
        let mut best: Option<(u64, bool, usize)> = None;

        for (idx, span) in self.spans.iter().enumerate() {
            if span.contains(seq) {
                return Some(&span.agent_name);
            }

            let (distance, starts_after) = if seq < span.start_seq {
                (span.start_seq - seq, true)
            } else {
                (seq - span.end_seq, false)
            };

            let replace = match best {
                None => true,
                Some((best_distance, best_after, _)) => {
                    distance < best_distance
                        || (distance == best_distance && starts_after && !best_after)
                }
            };
            if replace {
                best = Some((distance, starts_after, idx));
            }
        }

        best.map(|(_, _, idx)| self.spans[idx].agent_name.as_str())
    }
}
