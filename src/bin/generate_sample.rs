use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// One weekly observation of one bird.
struct Row {
    id: String,
    week: i64,
    initial: f64,
    final_weight: f64,
    consumption: f64,
    carcass: f64,
    feed_source: String,
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    // (treatment, daily gain factor, feed source)
    let treatments = [("T0", 1.00, "maiz"), ("T1", 1.06, "soya"), ("T2", 1.12, "harina de pescado")];
    let replicates = 4;
    let weeks = 6;

    let mut rows = Vec::new();
    for (code, factor, source) in treatments {
        for rep in 1..=replicates {
            let mut weight = rng.gauss(0.045, 0.003);
            for week in 1..=weeks {
                let gain = (0.06 * week as f64 * factor + rng.gauss(0.0, 0.02)).max(0.0);
                let consumption = gain * rng.gauss(1.6, 0.1);
                let final_weight = weight + gain;
                rows.push(Row {
                    id: format!("{code}R{rep}"),
                    week,
                    initial: round2(weight),
                    final_weight: round2(final_weight),
                    consumption: round2(consumption),
                    carcass: round2(final_weight * rng.gauss(0.72, 0.02)),
                    feed_source: source.to_string(),
                });
                weight = final_weight;
            }
        }
    }

    // CSV
    let csv_path = "sample_trial.csv";
    let mut writer = csv::Writer::from_path(csv_path).context("creating CSV")?;
    writer.write_record([
        "ID",
        "Semana",
        "Peso Inicial",
        "Peso Final",
        "Consumo",
        "Peso Carcasa",
        "Insumo",
    ])?;
    for r in &rows {
        writer.write_record([
            r.id.clone(),
            r.week.to_string(),
            r.initial.to_string(),
            r.final_weight.to_string(),
            r.consumption.to_string(),
            r.carcass.to_string(),
            r.feed_source.clone(),
        ])?;
    }
    writer.flush()?;

    // Parquet
    let schema = Arc::new(Schema::new(vec![
        Field::new("ID", DataType::Utf8, false),
        Field::new("Semana", DataType::Int64, false),
        Field::new("Peso Inicial", DataType::Float64, false),
        Field::new("Peso Final", DataType::Float64, false),
        Field::new("Consumo", DataType::Float64, false),
        Field::new("Peso Carcasa", DataType::Float64, false),
        Field::new("Insumo", DataType::Utf8, false),
    ]));
    let floats = |f: fn(&Row) -> f64| -> ArrayRef { Arc::new(Float64Array::from_iter_values(rows.iter().map(f))) };
    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.id.as_str()))),
            Arc::new(Int64Array::from_iter_values(rows.iter().map(|r| r.week))),
            floats(|r| r.initial),
            floats(|r| r.final_weight),
            floats(|r| r.consumption),
            floats(|r| r.carcass),
            Arc::new(StringArray::from_iter_values(rows.iter().map(|r| r.feed_source.as_str()))),
        ],
    )
    .context("building record batch")?;

    let parquet_path = "sample_trial.parquet";
    let file = std::fs::File::create(parquet_path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch)?;
    writer.close()?;

    println!("Wrote {} weekly observations to {csv_path} and {parquet_path}", rows.len());
    Ok(())
}
