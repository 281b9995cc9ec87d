use crate::codec::{Header, LayerMask, PROTO_TCP, TcpHeader, Transport};
use crate::device::{DeviceConfig, TxState};
use crate::net::{ChannelConfig, DeviceId, ListErrorModel, NetWorld, Packet};
use crate::scenario::{PauseQueue, ResumeQueue};
use crate::sim::{SimTime, Simulator};
use crate::trace::{DropReason, TraceEvent, TraceEventKind, TraceLogger};

const RATE_10G: u64 = 10_000_000_000;
const TX_1500_AT_10G: u64 = 1_200;
const IFG_NS: u64 = 96;

fn two_devices(delay: SimTime) -> (NetWorld, DeviceId, DeviceId) {
    let cfg = DeviceConfig {
        data_rate_bps: RATE_10G,
        interframe_gap_ns: IFG_NS,
        ..DeviceConfig::default()
    };
    let mut world = NetWorld::default();
    world.net.trace = Some(TraceLogger::default());
    let a = world.net.add_device("a", cfg.clone());
    let b = world.net.add_device("b", cfg);
    world.net.connect(a, b, &ChannelConfig { delay_ns: delay.0 });
    (world, a, b)
}

fn tcp_header() -> Header {
    Header::tcp(
        LayerMask::ALL,
        0x0a00_0001,
        0x0a00_0002,
        TcpHeader {
            sport: 1,
            dport: 2,
            seq: 1000,
            ..TcpHeader::default()
        },
    )
}

fn send(world: &mut NetWorld, sim: &mut Simulator, dev: DeviceId, queue: usize, bytes: u32) -> u64 {
    let hdr = tcp_header();
    let pkt = world.net.make_packet(&hdr, bytes);
    let id = pkt.id;
    world.net.send(dev, queue, pkt, &hdr, sim);
    id
}

fn events(world: &NetWorld) -> &[TraceEvent] {
    &world.net.trace.as_ref().expect("trace enabled").events
}

fn of(e: &TraceEvent, dev: DeviceId, pkt_id: u64) -> bool {
    e.dev == Some(dev.0) && e.pkt_id == Some(pkt_id)
}

fn times_of(world: &NetWorld, f: impl Fn(&TraceEvent) -> bool) -> Vec<u64> {
    events(world).iter().filter(|e| f(e)).map(|e| e.t_ns).collect()
}

#[test]
fn single_tcp_packet_end_to_end_timing() {
    let delay = SimTime::from_millis(1);
    let (mut world, a, b) = two_devices(delay);
    let mut sim = Simulator::default();

    let id = send(&mut world, &mut sim, a, 3, 1500);
    sim.run(&mut world);

    let enq = times_of(&world, |e| {
        of(e, a, id) && matches!(e.kind, TraceEventKind::Enqueue { queue: 3, .. })
    });
    let begin = times_of(&world, |e| of(e, a, id) && matches!(e.kind, TraceEventKind::TxBegin));
    let end = times_of(&world, |e| of(e, a, id) && matches!(e.kind, TraceEventKind::TxEnd));
    let rx = times_of(&world, |e| {
        of(e, b, id) && matches!(e.kind, TraceEventKind::Receive { .. })
    });

    assert_eq!(enq, vec![0]);
    assert_eq!(begin, vec![0]);
    assert_eq!(rx, vec![TX_1500_AT_10G + delay.0]);
    assert_eq!(end, vec![TX_1500_AT_10G + IFG_NS]);

    let chan = events(&world)
        .iter()
        .find_map(|e| match e.kind {
            TraceEventKind::ChannelTx { to, tx_ns, rx_ns } => Some((to, tx_ns, rx_ns)),
            _ => None,
        })
        .expect("channel tx traced");
    assert_eq!(chan, (b.0, 0, TX_1500_AT_10G + delay.0));

    assert_eq!(world.net.stats.delivered_pkts, 1);
    assert_eq!(world.net.stats.delivered_bytes, 1500);
    let sa = &world.net.device(a).stats;
    assert_eq!((sa.enqueued, sa.dequeued, sa.tx_pkts, sa.tx_bytes), (1, 1, 1, 1500));
    let sb = &world.net.device(b).stats;
    assert_eq!((sb.rx_pkts, sb.rx_bytes, sb.dropped), (1, 1500, 0));
    assert_eq!(world.net.device(a).tx().state(), TxState::Ready);
}

#[test]
fn receive_decodes_header_with_all_layers() {
    let (mut world, a, b) = two_devices(SimTime::from_micros(1));
    let mut sim = Simulator::default();
    send(&mut world, &mut sim, a, 0, 1500);
    sim.run(&mut world);

    let rx = events(&world)
        .iter()
        .find_map(|e| match e.kind {
            TraceEventKind::Receive { protocol, consumed } if e.dev == Some(b.0) => {
                Some((protocol, consumed))
            }
            _ => None,
        })
        .expect("receive traced");
    assert_eq!(rx, (PROTO_TCP, 14 + 20 + 62));
}

#[test]
fn back_to_back_packets_wait_for_transmit_complete() {
    let (mut world, a, _b) = two_devices(SimTime::from_micros(1));
    let mut sim = Simulator::default();

    let first = send(&mut world, &mut sim, a, 0, 1500);
    let second = send(&mut world, &mut sim, a, 0, 1500);
    assert!(world.net.device(a).tx().is_busy());
    assert_eq!(world.net.device(a).queues().len(0), 1);

    sim.run(&mut world);

    let begins: Vec<(u64, Option<u64>)> = events(&world)
        .iter()
        .filter(|e| e.dev == Some(a.0) && matches!(e.kind, TraceEventKind::TxBegin))
        .map(|e| (e.t_ns, e.pkt_id))
        .collect();
    assert_eq!(
        begins,
        vec![(0, Some(first)), (TX_1500_AT_10G + IFG_NS, Some(second))]
    );
    assert_eq!(world.net.stats.delivered_pkts, 2);
}

#[test]
fn resume_starts_exactly_one_transmission() {
    let (mut world, a, _b) = two_devices(SimTime::from_micros(1));
    let mut sim = Simulator::default();

    world.net.pause(a, 5, &mut sim);
    let p1 = send(&mut world, &mut sim, a, 5, 1500);
    let p2 = send(&mut world, &mut sim, a, 5, 1500);
    assert_eq!(world.net.device(a).queues().len(5), 2);
    assert!(!world.net.device(a).tx().is_busy());

    sim.schedule(SimTime(500), ResumeQueue { dev: a, queue: 5 });
    sim.run_until(SimTime(500), &mut world);

    assert!(world.net.device(a).tx().is_busy());
    assert_eq!(world.net.device(a).tx().current().map(|p| p.id), Some(p1));
    assert_eq!(world.net.device(a).queues().len(5), 1);

    sim.run(&mut world);
    let begins = times_of(&world, |e| e.dev == Some(a.0) && matches!(e.kind, TraceEventKind::TxBegin));
    assert_eq!(begins, vec![500, 500 + TX_1500_AT_10G + IFG_NS]);
    let second = events(&world)
        .iter()
        .filter(|e| matches!(e.kind, TraceEventKind::TxBegin))
        .nth(1)
        .and_then(|e| e.pkt_id);
    assert_eq!(second, Some(p2));
}

#[test]
fn pause_mid_run_holds_queue_until_resume() {
    let (mut world, a, _b) = two_devices(SimTime::from_micros(1));
    let mut sim = Simulator::default();

    send(&mut world, &mut sim, a, 2, 1500);
    send(&mut world, &mut sim, a, 2, 1500);
    // 第一个包在发送中；第二个包在发送完成前被暂停挡住
    sim.schedule(SimTime(100), PauseQueue { dev: a, queue: 2 });
    sim.schedule(SimTime(10_000), ResumeQueue { dev: a, queue: 2 });
    sim.run(&mut world);

    let begins = times_of(&world, |e| e.dev == Some(a.0) && matches!(e.kind, TraceEventKind::TxBegin));
    assert_eq!(begins, vec![0, 10_000]);
    assert_eq!(world.net.stats.delivered_pkts, 2);
}

#[test]
#[should_panic(expected = "Must be PAUSEd")]
fn resume_on_unpaused_queue_is_fatal() {
    let (mut world, a, _b) = two_devices(SimTime::ZERO);
    let mut sim = Simulator::default();
    world.net.resume(a, 1, &mut sim);
}

#[test]
fn take_down_drops_everything_queued_regardless_of_pause() {
    let (mut world, a, _b) = two_devices(SimTime::from_micros(1));
    let mut sim = Simulator::default();

    world.net.pause(a, 1, &mut sim);
    world.net.pause(a, 6, &mut sim);
    send(&mut world, &mut sim, a, 0, 1500); // 立即开始发送
    send(&mut world, &mut sim, a, 0, 1500);
    send(&mut world, &mut sim, a, 1, 1500);
    send(&mut world, &mut sim, a, 6, 1500);
    send(&mut world, &mut sim, a, 6, 1500);

    world.net.take_down(a, &mut sim);

    let dev = world.net.device(a);
    assert!(!dev.is_link_up());
    assert!(dev.queues().is_empty());
    assert!(dev.queues().paused().iter().all(|p| !p));
    assert_eq!(dev.stats.dropped, 4);

    let dropped = events(&world)
        .iter()
        .filter(|e| {
            matches!(
                e.kind,
                TraceEventKind::Drop {
                    queue: Some(_),
                    reason: DropReason::TakeDown
                }
            )
        })
        .count();
    assert_eq!(dropped, 4);

    // 已经在线上的包照常到达，之后不再发送
    sim.run(&mut world);
    assert_eq!(world.net.stats.delivered_pkts, 1);
    let begins = times_of(&world, |e| e.dev == Some(a.0) && matches!(e.kind, TraceEventKind::TxBegin));
    assert_eq!(begins, vec![0]);
}

#[test]
fn send_after_take_down_stays_queued_and_never_transmits() {
    let (mut world, a, _b) = two_devices(SimTime::ZERO);
    let mut sim = Simulator::default();
    world.net.take_down(a, &mut sim);

    send(&mut world, &mut sim, a, 0, 100);
    sim.run(&mut world);
    assert_eq!(world.net.device(a).stats.tx_pkts, 0);
    assert_eq!(world.net.device(a).queues().len(0), 1);
}

#[test]
fn receive_on_downed_device_is_dropped() {
    let (mut world, a, b) = two_devices(SimTime::from_micros(1));
    let mut sim = Simulator::default();

    send(&mut world, &mut sim, a, 0, 1500);
    world.net.take_down(b, &mut sim);
    sim.run(&mut world);

    assert_eq!(world.net.stats.delivered_pkts, 0);
    assert_eq!(world.net.device(b).stats.dropped, 1);
    assert_eq!(world.net.device(b).stats.rx_pkts, 0);
    assert!(events(&world).iter().any(|e| e.dev == Some(b.0)
        && matches!(
            e.kind,
            TraceEventKind::Drop {
                queue: None,
                reason: DropReason::LinkDown
            }
        )));
}

#[test]
fn transmit_start_on_downed_device_drops_packet() {
    let (mut world, a, _b) = two_devices(SimTime::from_micros(1));
    let mut sim = Simulator::default();
    world.net.take_down(a, &mut sim);

    let hdr = tcp_header();
    let pkt = world.net.make_packet(&hdr, 1500);
    let id = pkt.id;
    assert!(!world.net.transmit_start(a, pkt, &mut sim));
    sim.run(&mut world);

    let dev = world.net.device(a);
    assert_eq!(dev.stats.dropped, 1);
    assert_eq!(dev.stats.tx_pkts, 0);
    assert_eq!(dev.tx().state(), TxState::Ready);
    assert!(events(&world).iter().any(|e| of(e, a, id)
        && matches!(
            e.kind,
            TraceEventKind::Drop {
                queue: None,
                reason: DropReason::LinkDown
            }
        )));
    assert!(!events(&world).iter().any(|e| matches!(e.kind, TraceEventKind::TxBegin)));
}

#[test]
fn corrupt_packets_are_dropped_before_decode() {
    let (mut world, a, b) = two_devices(SimTime::from_micros(1));
    let mut sim = Simulator::default();
    world
        .net
        .set_error_model(b, Box::new(ListErrorModel::new([1])));

    send(&mut world, &mut sim, a, 0, 1500); // id 0
    send(&mut world, &mut sim, a, 0, 1500); // id 1
    send(&mut world, &mut sim, a, 0, 1500); // id 2
    sim.run(&mut world);

    assert_eq!(world.net.stats.delivered_pkts, 2);
    assert_eq!(world.net.device(b).stats.dropped, 1);
    let receives: Vec<Option<u64>> = events(&world)
        .iter()
        .filter(|e| matches!(e.kind, TraceEventKind::Receive { .. }))
        .map(|e| e.pkt_id)
        .collect();
    assert_eq!(receives, vec![Some(0), Some(2)]);
}

#[test]
fn closure_error_model_sees_every_packet() {
    let (mut world, a, b) = two_devices(SimTime::from_micros(1));
    let mut sim = Simulator::default();
    world
        .net
        .set_error_model(b, Box::new(|p: &Packet| p.size_bytes > 1000));

    send(&mut world, &mut sim, a, 0, 1500);
    send(&mut world, &mut sim, a, 0, 500);
    sim.run(&mut world);

    assert_eq!(world.net.stats.delivered_pkts, 1);
    assert_eq!(world.net.stats.delivered_bytes, 500);
}

#[test]
fn unattached_device_drops_on_channel_reject() {
    let mut world = NetWorld::default();
    world.net.trace = Some(TraceLogger::default());
    let a = world.net.add_device("a", DeviceConfig::default());
    let b = world.net.add_device("b", DeviceConfig::default());
    let ch = world.net.add_channel(&ChannelConfig::default());
    world.net.attach(a, ch);
    let mut sim = Simulator::default();

    send(&mut world, &mut sim, a, 0, 1500);
    assert_eq!(world.net.device(a).stats.dropped, 1);
    assert!(events(&world).iter().any(|e| matches!(
        e.kind,
        TraceEventKind::Drop {
            reason: DropReason::ChannelRejected,
            ..
        }
    )));

    // 状态机仍然走完 BUSY -> READY
    sim.run(&mut world);
    assert_eq!(world.net.device(a).tx().state(), TxState::Ready);
    assert_eq!(world.net.device(b).stats.rx_pkts, 0);
}

#[test]
fn update_next_available_pulls_pending_drain_forward() {
    let (mut world, a, _b) = two_devices(SimTime::from_micros(1));
    let mut sim = Simulator::default();

    // 没有待执行的出队尝试时什么都不做
    world.net.update_next_available(a, SimTime(5), &mut sim);
    assert_eq!(world.net.device(a).next_send, None);
    assert_eq!(sim.pending_events(), 0);

    world.net.schedule_drain_at(a, SimTime(50_000), &mut sim);
    let later = world.net.device(a).next_send.expect("drain armed");
    assert_eq!(sim.scheduled_at(later), Some(SimTime(50_000)));

    // 晚于当前计划：不动
    world.net.update_next_available(a, SimTime(60_000), &mut sim);
    assert_eq!(world.net.device(a).next_send, Some(later));
    assert!(sim.is_pending(later));

    // 早于当前计划：取消并改到 t
    world.net.update_next_available(a, SimTime(20_000), &mut sim);
    let pulled = world.net.device(a).next_send.expect("drain re-armed");
    assert_ne!(pulled, later);
    assert!(!sim.is_pending(later));
    assert_eq!(sim.scheduled_at(pulled), Some(SimTime(20_000)));
    assert_eq!(sim.pending_events(), 1);

    sim.run_until(SimTime(19_999), &mut world);
    assert!(sim.is_pending(pulled));
    sim.run_until(SimTime(20_000), &mut world);
    assert!(!sim.is_pending(pulled));
}

#[test]
fn pending_drain_fires_queued_work() {
    let (mut world, a, _b) = two_devices(SimTime::from_micros(1));
    let mut sim = Simulator::default();

    world.net.pause(a, 4, &mut sim);
    send(&mut world, &mut sim, a, 4, 1500);
    sim.schedule(SimTime(1_000), ResumeQueue { dev: a, queue: 4 });
    world.net.schedule_drain_at(a, SimTime(3_000), &mut sim);
    world.net.update_next_available(a, SimTime(2_000), &mut sim);
    sim.run(&mut world);

    // 恢复时已发送；之后的出队尝试在空队列上空转
    let begins = times_of(&world, |e| e.dev == Some(a.0) && matches!(e.kind, TraceEventKind::TxBegin));
    assert_eq!(begins, vec![1_000]);
    assert_eq!(world.net.stats.delivered_pkts, 1);
}

#[test]
fn update_next_available_in_the_past_reschedules_at_now() {
    let (mut world, a, _b) = two_devices(SimTime::ZERO);
    let mut sim = Simulator::default();
    sim.run_until(SimTime(1_000), &mut world);

    world.net.schedule_drain_at(a, SimTime(9_000), &mut sim);
    world.net.update_next_available(a, SimTime(10), &mut sim);
    let id = world.net.device(a).next_send.expect("drain armed");
    assert_eq!(sim.scheduled_at(id), Some(SimTime(1_000)));
}

#[test]
fn packets_in_flight_keep_their_header_bytes() {
    let (mut world, a, _b) = two_devices(SimTime::ZERO);
    let mut sim = Simulator::default();
    let hdr = tcp_header();
    let pkt = world.net.make_packet(&hdr, 10);
    assert_eq!(pkt.size_bytes as usize, hdr.serialized_size(), "size grows to fit header");

    let mut back = Header::new(LayerMask::ALL);
    assert_eq!(pkt.peek_header(&mut back), hdr.serialized_size());
    match back.transport {
        Transport::Tcp(tcp) => assert_eq!(tcp.seq, 1000),
        other => panic!("expected tcp, got {other:?}"),
    }
    world.net.send(a, 0, pkt, &hdr, &mut sim);
    assert!(world.net.device(a).tx().current().is_some_and(|p| p.ingress.is_none()));
}
