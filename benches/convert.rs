use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use ir_capture::capture::synthetic_frame;
use ir_capture::pipeline::{ColorBuffer, FrameBufferPair, PixelConverter, SampleReduction};

const WIDTH: u32 = 340;
const HEIGHT: u32 = 340;

fn bench_convert(c: &mut Criterion) {
    let frame = synthetic_frame(WIDTH, HEIGHT, 7);
    let mut group = c.benchmark_group("convert_340x340");
    group.throughput(Throughput::Elements(frame.pixel_count() as u64));

    for (label, reduction) in [
        ("low_byte", SampleReduction::LowByte),
        ("high_byte", SampleReduction::HighByte),
        ("scaled_1023", SampleReduction::Scaled { max: 1023 }),
    ] {
        let converter = PixelConverter::new(reduction);
        let mut target = ColorBuffer::new(WIDTH, HEIGHT);
        group.bench_function(label, |b| {
            b.iter(|| {
                let lock = frame.lock_buffer();
                converter.convert_frame(black_box(&lock), &mut target).unwrap();
            })
        });
    }
    group.finish();
}

fn bench_present(c: &mut Criterion) {
    let frame = synthetic_frame(WIDTH, HEIGHT, 7);
    let converter = PixelConverter::new(SampleReduction::LowByte);
    let mut pair = FrameBufferPair::create(WIDTH, HEIGHT);

    c.bench_function("convert_and_swap_340x340", |b| {
        b.iter(|| {
            let lock = frame.lock_buffer();
            converter.convert_frame(&lock, pair.back_mut()).unwrap();
            pair.swap();
            black_box(pair.front().as_bytes()[0])
        })
    });
}

criterion_group!(benches, bench_convert, bench_present);
criterion_main!(benches);
