use crate::priv_prelude::*;

/// Error raised when a packet can't be admitted to a link.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdmitError {
    #[error("packet size {size} is greater than maximum {max}")]
    PacketTooLarge {
        size: usize,
        max: usize,
    },
}

struct InTransit {
    packet: QueuedPacket,
    bytes_left: usize,
}

/// A link whose capacity follows a schedule of delivery opportunities.
///
/// Packets admitted to the link wait in its [`PacketQueue`](crate::queue::PacketQueue). Each
/// delivery opportunity lets up to [`MAX_OPPORTUNITY_BYTES`](crate::MAX_OPPORTUNITY_BYTES)
/// leave, so large packets may be spread across several opportunities and several small packets
/// may share one. Packets whose last byte has left are held in an output queue until the host
/// drains it.
///
/// The link is driven entirely by its host. Every call that takes a `now` (milliseconds since the
/// link's [`ClockOrigin`](crate::ClockOrigin)) first catches the link up to `now`; the variants
/// without a `now` read the clock themselves. Calls are expected to come from one thread, in
/// order.
///
/// Use [`TraceLinkBuilder`](crate::TraceLinkBuilder) to create one.
pub struct TraceLink {
    name: String,
    clock: ClockOrigin,
    schedule: Schedule,
    next_delivery: usize,
    base_timestamp: u64,
    repeat: bool,
    finished: bool,
    packet_queue: Box<dyn PacketQueue>,
    packet_in_transit_opt: Option<InTransit>,
    output_queue: VecDeque<Bytes>,
    live_feed_opt: Option<Box<dyn ScheduleFeed>>,
    observers: Vec<Box<dyn LinkObserver>>,
}

impl TraceLink {
    #[cfg_attr(feature="cargo-clippy", allow(clippy::too_many_arguments))]
    pub(crate) fn new(
        name: String,
        clock: ClockOrigin,
        schedule: Schedule,
        base_timestamp: u64,
        repeat: bool,
        packet_queue: Box<dyn PacketQueue>,
        live_feed_opt: Option<Box<dyn ScheduleFeed>>,
        observers: Vec<Box<dyn LinkObserver>>,
    ) -> TraceLink {
        TraceLink {
            name,
            clock,
            schedule,
            next_delivery: 0,
            base_timestamp,
            repeat,
            finished: false,
            packet_queue,
            packet_in_transit_opt: None,
            output_queue: VecDeque::new(),
            live_feed_opt,
            observers,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn clock(&self) -> ClockOrigin {
        self.clock
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// The index of the next delivery opportunity within the schedule.
    pub fn next_delivery(&self) -> usize {
        self.next_delivery
    }

    /// The time that the current period of the schedule is offset from.
    pub fn base_timestamp(&self) -> u64 {
        self.base_timestamp
    }

    /// Whether a one-shot link has used up its schedule. A finished link never delivers again.
    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Whether delivered packets are waiting to be drained.
    pub fn pending_output(&self) -> bool {
        !self.output_queue.is_empty()
    }

    /// Whether any admitted packet has yet to be fully delivered.
    pub fn has_backlog(&self) -> bool {
        self.packet_in_transit_opt.is_some() || !self.packet_queue.is_empty()
    }

    /// The time of the next delivery opportunity, or `None` if the link is finished.
    pub fn next_delivery_time(&self) -> Option<u64> {
        if self.finished {
            None
        } else {
            Some(self.schedule.offset(self.next_delivery) + self.base_timestamp)
        }
    }

    /// Admits a packet arriving at `now`.
    ///
    /// The link is first caught up to just before `now`, so opportunities falling in the same
    /// millisecond the packet arrives in are still available to it. The packet is then handed to
    /// the queue; if the queue holds fewer packets or bytes afterwards than it would have with
    /// the packet simply appended, the shortfall is recorded as a drop. Oversized packets are
    /// rejected without touching the link.
    pub fn admit(&mut self, contents: Bytes, now: u64) -> Result<(), AdmitError> {
        if contents.len() > MAX_OPPORTUNITY_BYTES {
            return Err(AdmitError::PacketTooLarge {
                size: contents.len(),
                max: MAX_OPPORTUNITY_BYTES,
            });
        }

        self.advance(now, false);

        let size = contents.len();
        self.record(LinkEvent::Arrival { time: now, size });

        let bytes_before = self.packet_queue.size_bytes();
        let packets_before = self.packet_queue.size_packets();

        self.packet_queue.enqueue(QueuedPacket::new(contents, now));

        let bytes_after = self.packet_queue.size_bytes();
        let packets_after = self.packet_queue.size_packets();
        if packets_after > packets_before + 1 || bytes_after > bytes_before + size {
            debug!(
                "{}: queue grew by more than the admitted packet ({} -> {} packets, {} -> {} bytes)",
                self.name, packets_before, packets_after, bytes_before, bytes_after,
            );
        }
        let missing_packets = (packets_before + 1).saturating_sub(packets_after);
        let missing_bytes = (bytes_before + size).saturating_sub(bytes_after);
        if missing_packets > 0 || missing_bytes > 0 {
            self.record(LinkEvent::Drop {
                time: now,
                packets: missing_packets,
                bytes: missing_bytes,
            });
        }
        Ok(())
    }

    /// Admits a packet arriving now.
    pub fn read_packet(&mut self, contents: impl Into<Bytes>) -> Result<(), AdmitError> {
        let now = self.clock.now();
        self.admit(contents.into(), now)
    }

    /// Emulates the link up to `now`.
    ///
    /// Consults the live feed (if any), then uses every delivery opportunity due at or before
    /// `now`, in order. This should be called before enqueueing packets and before calculating
    /// how long to wait until the next event, which `admit` and `time_until_next_action` do.
    pub fn evaluate(&mut self, now: u64) {
        self.advance(now, true);
    }

    fn advance(&mut self, now: u64, include_now: bool) {
        self.poll_live_feed();

        while let Some(delivery_time) = self.next_delivery_time() {
            if delivery_time > now || (delivery_time == now && !include_now) {
                break;
            }

            /* burn a delivery opportunity */
            let mut bytes_left_in_this_delivery = MAX_OPPORTUNITY_BYTES;
            self.use_a_delivery_opportunity(delivery_time);

            while bytes_left_in_this_delivery > 0 {
                if self.packet_in_transit_opt.is_none() {
                    let packet = match self.packet_queue.dequeue() {
                        Some(packet) => packet,
                        None => break,
                    };
                    let bytes_left = packet.len();
                    self.packet_in_transit_opt = Some(InTransit { packet, bytes_left });
                }
                let in_transit = match self.packet_in_transit_opt.as_mut() {
                    Some(in_transit) => in_transit,
                    None => break,
                };

                debug_assert!(in_transit.packet.arrival_time <= delivery_time);
                debug_assert!(in_transit.bytes_left <= MAX_OPPORTUNITY_BYTES);
                debug_assert!(in_transit.bytes_left <= in_transit.packet.len());

                /* how many bytes of the delivery opportunity can we use? */
                let amount_to_send = cmp::min(bytes_left_in_this_delivery, in_transit.bytes_left);
                in_transit.bytes_left -= amount_to_send;
                bytes_left_in_this_delivery -= amount_to_send;

                if in_transit.bytes_left == 0 {
                    if let Some(InTransit { packet, .. }) = self.packet_in_transit_opt.take() {
                        self.record(LinkEvent::Departure {
                            time: delivery_time,
                            size: packet.len(),
                            delay: delivery_time.saturating_sub(packet.arrival_time),
                        });
                        self.output_queue.push_back(packet.contents);
                    }
                }
            }
        }
    }

    /// Catches the link up to `now` and returns how many milliseconds the host may wait before it
    /// needs to act again, or `None` if the link is finished and will never deliver again.
    pub fn time_until_next_action(&mut self, now: u64) -> Option<u64> {
        self.evaluate(now);
        let next_delivery_time = self.next_delivery_time()?;
        Some(next_delivery_time.saturating_sub(now))
    }

    /// Like [`time_until_next_action`](crate::TraceLink::time_until_next_action), using the
    /// current time.
    pub fn wait_time(&mut self) -> Option<Duration> {
        let now = self.clock.now();
        self.time_until_next_action(now).map(Duration::from_millis)
    }

    /// Removes the next delivered packet from the output queue.
    pub fn pop_output(&mut self) -> Option<Bytes> {
        self.output_queue.pop_front()
    }

    /// Removes every delivered packet from the output queue, oldest first.
    pub fn drain_output(&mut self) -> impl Iterator<Item = Bytes> + '_ {
        self.output_queue.drain(..)
    }

    /// Writes every delivered packet to `writer`, one `write` call per packet.
    ///
    /// If a write fails the failing packet and everything after it stay queued.
    pub fn write_packets<W: Write>(&mut self, writer: &mut W) -> io::Result<()> {
        while let Some(packet) = self.output_queue.front() {
            let written = writer.write(packet)?;
            if written != packet.len() {
                warn!(
                    "{}: short write of delivered packet ({} of {} bytes)",
                    self.name, written, packet.len(),
                );
            }
            let _packet = self.output_queue.pop_front();
        }
        Ok(())
    }

    /// Replaces the schedule wholesale, as the live feed does.
    ///
    /// The offset the link had reached in the old schedule is folded into the base timestamp and
    /// the new schedule starts from its first opportunity. A finished link stays finished.
    pub fn replace_schedule(&mut self, schedule: Schedule) {
        self.splice_schedule(schedule);
    }

    fn poll_live_feed(&mut self) {
        let schedule_opt = match self.live_feed_opt.as_mut() {
            Some(live_feed) => live_feed.poll_schedule(),
            None => None,
        };
        if let Some(schedule) = schedule_opt {
            self.splice_schedule(schedule);
        }
    }

    // The time base must be advanced using the old schedule before the swap. Whatever remained
    // of the opportunity window the old schedule was in is abandoned.
    fn splice_schedule(&mut self, schedule: Schedule) {
        let elapsed = self.schedule.offset(self.next_delivery);
        self.base_timestamp += elapsed;
        debug!(
            "{}: replacing {:?} at index {} with {:?}, base timestamp now {}",
            self.name, self.schedule, self.next_delivery, schedule, self.base_timestamp,
        );
        self.schedule = schedule;
        self.next_delivery = 0;
    }

    fn use_a_delivery_opportunity(&mut self, delivery_time: u64) {
        self.record(LinkEvent::Opportunity {
            time: delivery_time,
            size: MAX_OPPORTUNITY_BYTES,
        });

        self.next_delivery = (self.next_delivery + 1) % self.schedule.len();

        /* wraparound */
        if self.next_delivery == 0 {
            if self.repeat {
                self.base_timestamp += self.schedule.period();
            } else {
                debug!("{}: one-shot trace finished at {}", self.name, delivery_time);
                self.finished = true;
            }
        }
    }

    fn record(&mut self, event: LinkEvent) {
        for observer in &mut self.observers {
            observer.observe(&event);
        }
    }
}

impl fmt::Debug for TraceLink {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TraceLink")
            .field("name", &self.name)
            .field("schedule", &self.schedule)
            .field("next_delivery", &self.next_delivery)
            .field("base_timestamp", &self.base_timestamp)
            .field("repeat", &self.repeat)
            .field("finished", &self.finished)
            .field("queued_packets", &self.packet_queue.size_packets())
            .field("pending_output", &self.output_queue.len())
            .finish()
    }
}
