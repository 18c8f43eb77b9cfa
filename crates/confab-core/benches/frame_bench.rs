use confab_core::messages::{IndexFrame, StreamDescriptor, SubscribeFrame};
use confab_core::policy::{DownlinkPolicy, PriorityPolicyConfig, VideoPriorityBasedPolicy};
use confab_core::{FrameCodec, SignalFrame, VideoStreamIndex};
use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};

fn sdp_offer(media_sections: usize) -> String {
    let mut sdp = String::from("v=0\r\no=- 4611731400430051336 2 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n");
    for mid in 0..media_sections {
        sdp.push_str(&format!(
            "m=video 9 UDP/TLS/RTP/SAVPF 96 97\r\nc=IN IP4 0.0.0.0\r\na=mid:{mid}\r\n\
             a=rtpmap:96 VP8/90000\r\na=rtcp-fb:96 nack pli\r\na=rtpmap:97 rtx/90000\r\n\
             a=fmtp:97 apt=96\r\na=recvonly\r\n"
        ));
    }
    sdp
}

fn subscribe(media_sections: usize) -> SignalFrame {
    SignalFrame::Subscribe(SubscribeFrame {
        receive_stream_ids: (1..=media_sections as u32).collect(),
        sdp_offer: sdp_offer(media_sections),
        audio_host: "audio.example.com:3478".into(),
        ..Default::default()
    })
}

fn index(attendees: u32) -> IndexFrame {
    let mut sources = Vec::new();
    for attendee in 0..attendees {
        for (layer, kbps) in [(0, 150), (1, 600), (2, 1200)] {
            sources.push(StreamDescriptor {
                stream_id: attendee * 3 + layer + 1,
                group_id: attendee + 1,
                max_bitrate_kbps: kbps,
                attendee_id: format!("attendee-{attendee:03}"),
                ..Default::default()
            });
        }
    }
    IndexFrame {
        sources,
        num_participants: attendees + 1,
        ..Default::default()
    }
}

fn bench_subscribe_encode(c: &mut Criterion) {
    let frame = subscribe(25);
    let plain = FrameCodec::new();
    let compressed = FrameCodec::with_sdp_compression();

    let mut group = c.benchmark_group("subscribe_encode");
    group.throughput(Throughput::Bytes(sdp_offer(25).len() as u64));
    group.bench_function("plain_sdp", |b| b.iter(|| plain.encode(black_box(&frame))));
    group.bench_function("compressed_sdp", |b| {
        b.iter(|| compressed.encode(black_box(&frame)))
    });
    group.finish();
}

fn bench_subscribe_decode(c: &mut Criterion) {
    let frame = subscribe(25);
    let codec = FrameCodec::new();
    let plain = codec.encode(&frame).unwrap();
    let compressed = FrameCodec::with_sdp_compression().encode(&frame).unwrap();

    let mut group = c.benchmark_group("subscribe_decode");
    group.throughput(Throughput::Bytes(plain.len() as u64));
    group.bench_function("plain_sdp", |b| b.iter(|| codec.decode(black_box(&plain))));
    group.bench_function("compressed_sdp", |b| {
        b.iter(|| codec.decode(black_box(&compressed)))
    });
    group.finish();
}

fn bench_index_integration(c: &mut Criterion) {
    let frame = index(25);

    c.bench_function("index_integrate_25_attendees", |b| {
        b.iter(|| {
            let mut stream_index = VideoStreamIndex::new("local");
            stream_index.integrate_index_frame(black_box(&frame))
        })
    });
}

fn bench_priority_policy(c: &mut Criterion) {
    let mut stream_index = VideoStreamIndex::new("local");
    stream_index.integrate_index_frame(&index(25));
    let policy = VideoPriorityBasedPolicy::new(PriorityPolicyConfig {
        initial_downlink_estimate_kbps: 8000,
        ..PriorityPolicyConfig::default()
    });

    c.bench_function("priority_policy_25_attendees", |b| {
        b.iter(|| policy.choose_subscriptions(black_box(&stream_index)))
    });
}

criterion_group!(
    benches,
    bench_subscribe_encode,
    bench_subscribe_decode,
    bench_index_integration,
    bench_priority_policy
);
criterion_main!(benches);
