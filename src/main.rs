use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use image::imageops::FilterType;
use indicatif::*;
use log::debug;
use rayon::prelude::*;
use regex::Regex;

use mono_video::ascii::write_frame;
use mono_video::binarize::binarize_image;
use mono_video::*;

/// How many frames are loaded in parallel before being handed to the encoder in order
const LOAD_BATCH: usize = 256;

#[derive(Parser, Debug)]
#[command(version, about = "Encode, inspect, and play 1-bit video streams")]
struct Opts {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Encode a folder of numbered frames into a stream
    Encode(EncodeOpts),

    /// Print a stream's header and what it will decode to
    Info {
        file: PathBuf,

        /// Frame rate used to report the running time
        #[arg(long, default_value_t = DEFAULT_FPS)]
        fps: u32,
    },

    /// Dump decoded frames as text, '@' for foreground and '-' for background
    Ascii {
        file: PathBuf,

        /// Write here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Only dump the first N frames
        #[arg(long)]
        take: Option<usize>,
    },

    /// Play a stream in the terminal
    Play {
        file: PathBuf,

        #[arg(long, default_value_t = DEFAULT_FPS)]
        fps: u32,

        /// Stop after looping N times. Plays forever by default.
        #[arg(long)]
        loops: Option<usize>,

        /// Advance at most one frame per redraw instead of catching up
        #[arg(long)]
        single_step: bool,
    },
}

#[derive(Args, Debug)]
struct EncodeOpts {
    /// Path to folder with frames as numbered image files (e.g. "bad_apple_1234.png")
    #[arg(value_name = "DIR", default_value = "frames")]
    frames_dir: PathBuf,

    #[arg(short, long = "output", default_value = "out.bin")]
    output: PathBuf,

    /// Resize the video from the input dimensions.
    /// If only one of --width/--height are provided, aspect ratio is preserved.
    #[arg(long)]
    width: Option<u32>,

    /// Resize the video from the input dimensions.
    /// If only one of --width/--height are provided, aspect ratio is preserved.
    #[arg(long)]
    height: Option<u32>,

    /// Discard the first N frames, and continue taking frames after
    #[arg(long)]
    skip: Option<usize>,

    /// Take N frames and discard the rest
    #[arg(long)]
    take: Option<usize>,

    /// Drop frames to reduce framerates "1" keeps every frame, "2" keeps every other, "3" keeps every 3rd, etc
    #[arg(long, default_value = "1")]
    frame_rate_div: usize,

    /// Value written to the header's (advisory) frame count. Defaults to the frames found.
    #[arg(long)]
    frame_count: Option<u32>,
}

fn main() {
    env_logger::init();
    let opts = Opts::parse();

    let res = match opts.cmd {
        Cmd::Encode(opts) => encode(opts),
        Cmd::Info { file, fps } => info(&file, fps),
        Cmd::Ascii { file, output, take } => ascii(&file, output.as_deref(), take),
        Cmd::Play {
            file,
            fps,
            loops,
            single_step,
        } => play(&file, fps, loops, single_step),
    };

    if let Err(err) = res {
        eprintln!("[ERROR] {err}");
        std::process::exit(1);
    }
}

fn encode(opts: EncodeOpts) -> Result<()> {
    let pattern = Regex::new(r"[a-zA-Z_-]+([0-9]+)\.png$").expect("frame pattern is valid");

    println!("+ Looking for frames in {:?}", opts.frames_dir.display());
    let mut file_paths = find_files(&opts.frames_dir, &pattern)?;
    println!("+ Found {} frames", file_paths.len());

    if let Some(skip) = opts.skip {
        println!("+ Skipping first {skip} frames");
        file_paths.drain(..skip.min(file_paths.len()));
        println!("+ Done (now have {} frames)", file_paths.len());
        println!();
    }

    if opts.frame_rate_div > 1 {
        println!("+ Dropping 1 in {} frames", opts.frame_rate_div);
        file_paths = file_paths
            .into_iter()
            .step_by(opts.frame_rate_div)
            .collect();
        println!("+ Done (now have {} frames)", file_paths.len());
        println!();
    }

    if let Some(take) = opts.take {
        println!("+ Truncating to {take} frames");
        let take = file_paths.len().min(take);
        file_paths.drain(take..);
        println!("+ Done (now have {} frames)", file_paths.len());
        println!();
    }

    let Some((_id, first)) = file_paths.first() else {
        return Err(CodecError::InvalidFrame(format!(
            "no frames matching {pattern} in {}",
            opts.frames_dir.display()
        )));
    };

    let (in_width, in_height) = image::image_dimensions(first)?;
    let (out_width, out_height) = resolve_dimensions(opts.width, opts.height, in_width, in_height);

    // Note: HumanCount doesn't respect format controls, so we `to_string()` and format that.
    println!(
        "+ OLD Dimensions: {:>5} x {:>5}",
        HumanCount(in_width as u64).to_string(),
        HumanCount(in_height as u64).to_string(),
    );
    println!(
        "+ NEW dimensions: {:>5} x {:>5}",
        HumanCount(out_width as u64).to_string(),
        HumanCount(out_height as u64).to_string(),
    );

    let mut output = opts.output;
    if output.is_dir() {
        output.push("out.bin");
    }

    let frame_count = opts.frame_count.unwrap_or(file_paths.len() as u32);
    let mut encoder = VideoEncoder::create(&output, out_width, out_height, frame_count)?;
    println!(
        "+ Expecting {}",
        BinaryBytes(StreamInfo::encoded_len(
            &encoder.header(),
            file_paths.len() as u64
        ))
    );

    println!("+ Encoding {} frames", file_paths.len());
    let pb = ProgressBar::new(file_paths.len() as u64);
    for batch in file_paths.chunks(LOAD_BATCH) {
        // Load + binarize in parallel, but encode strictly in order
        let masks: Vec<Result<BinaryMask>> = batch
            .par_iter()
            .map(|(_id, path)| {
                let img = image::open(path)?;
                let img = if (img.width(), img.height()) == (out_width, out_height) {
                    img
                } else {
                    img.resize_exact(out_width, out_height, FilterType::Nearest)
                };
                binarize_image(&img)
            })
            .collect();

        for mask in masks {
            encoder.push_mask(&mask?)?;
            pb.inc(1);
        }
    }
    pb.finish();

    let frames_written = encoder.frames_written();
    encoder.finish()?;
    println!("+ Done");
    println!();

    let info = StreamInfo::read(&output)?;
    println!(
        "+ Encoded {frames_written} frames as {}.",
        BinaryBytes(info.payload_len() + CodecHeader::SIZE as u64)
    );

    Ok(())
}

fn info(file: &Path, fps: u32) -> Result<()> {
    let info = StreamInfo::read(file)?;
    let header = info.header();

    println!("+ {}", file.display());
    println!("+ Dimensions:       {} x {}", header.width, header.height);
    println!("+ Bytes per frame:  {}", BinaryBytes(header.bytes_per_frame() as u64));
    println!("+ Payload:          {}", BinaryBytes(info.payload_len()));
    println!("+ Declared frames:  {}", header.frame_count);
    println!("+ Decodable frames: {}", info.decodable_frames());
    println!("+ Trailing bits:    {}", info.trailing_bits());
    println!(
        "+ Duration:         {} ({fps} fps)",
        HumanDuration(info.duration(fps))
    );

    if !info.frame_count_matches() {
        println!("[WARNING] The declared frame count is advisory and doesn't match the payload");
    }

    Ok(())
}

fn ascii(file: &Path, output: Option<&Path>, take: Option<usize>) -> Result<()> {
    let decoder = VideoDecoder::open(file)?;

    let mut out: Box<dyn Write> = match output {
        Some(path) => {
            let f = File::create(path).map_err(|source| CodecError::Unavailable {
                path: path.to_owned(),
                source,
            })?;
            Box::new(BufWriter::new(f))
        }
        None => Box::new(io::stdout().lock()),
    };

    for frame in decoder.take(take.unwrap_or(usize::MAX)) {
        let frame = frame?;
        write_frame(&mut out, &frame)?;
        writeln!(out)?;
    }
    out.flush()?;

    Ok(())
}

fn play(file: &Path, fps: u32, loops: Option<usize>, single_step: bool) -> Result<()> {
    let policy = if single_step {
        AdvancePolicy::Single
    } else {
        AdvancePolicy::CatchUp
    };

    println!("+ Decoding {}", file.display());
    let decoder = VideoDecoder::open(file)?;
    let mut playback = Playback::from_decoder(decoder, FrameClock::new(fps).with_policy(policy))?;
    println!("+ Decoded {} frames", playback.len());

    let poll = playback.clock().interval() / 4;
    let mut stdout = io::stdout().lock();
    let mut shown = None;
    let mut last = Instant::now();

    // Clear once, then redraw in place
    write!(stdout, "\x1B[2J")?;
    loop {
        let now = Instant::now();
        let frame = playback.tick(now - last);
        last = now;

        if shown != Some(frame.id()) {
            shown = Some(frame.id());
            write!(stdout, "\x1B[H")?;
            write_frame(&mut stdout, frame)?;
            stdout.flush()?;
        }

        if loops.is_some_and(|loops| playback.loops_completed() >= loops) {
            break;
        }

        std::thread::sleep(poll.max(Duration::from_millis(1)));
    }

    debug!("Stopped after {} loops", playback.loops_completed());
    Ok(())
}

fn find_files(dir: &Path, pattern: &Regex) -> Result<Vec<(usize, PathBuf)>> {
    let mut files = vec![];

    for entry in std::fs::read_dir(dir).map_err(|source| CodecError::Unavailable {
        path: dir.to_owned(),
        source,
    })? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }

        // Stray files and absurdly long digit runs are skipped
        let Some(id) = frame_id(pattern, &path) else {
            continue;
        };

        files.push((id, path));
    }

    files.sort();

    let missing = missing_ids(&files);
    if !missing.is_empty() {
        println!(
            "[WARNING] Missing frames from the range {}..{}:",
            files[0].0,
            files[files.len() - 1].0
        );
        for id in missing {
            println!("    Missing frame {id}");
        }
    }

    let duplicated = duplicate_ids(&files);
    if !duplicated.is_empty() {
        println!("[WARNING] Frame numbers shared by more than one file (all are encoded):");
        for id in duplicated {
            let paths = files.iter().filter(|(other, _)| *other == id);
            for (_id, path) in paths {
                println!("    Frame {id}: {}", path.display());
            }
        }
    }

    Ok(files)
}

/// Gaps in an id-sorted file list
fn missing_ids(files: &[(usize, PathBuf)]) -> Vec<usize> {
    files
        .windows(2)
        .flat_map(|pair| (pair[0].0 + 1)..pair[1].0)
        .collect()
}

/// Ids shared by more than one file in an id-sorted file list, each reported once
fn duplicate_ids(files: &[(usize, PathBuf)]) -> Vec<usize> {
    let mut ids: Vec<usize> = files
        .windows(2)
        .filter(|pair| pair[0].0 == pair[1].0)
        .map(|pair| pair[0].0)
        .collect();
    ids.dedup();
    ids
}

fn frame_id(pattern: &Regex, path: &Path) -> Option<usize> {
    let name = path.to_string_lossy();
    pattern.captures(&name)?.get(1)?.as_str().parse().ok()
}

fn resolve_dimensions(
    opts_width: Option<u32>,
    opts_height: Option<u32>,
    img_width: u32,
    img_height: u32,
) -> (u32, u32) {
    let img_ratio = img_width as f32 / img_height as f32;

    match (opts_width, opts_height) {
        // If neither are provided, we don't do resizing
        (None, None) => (img_width, img_height),

        // If both are provided, we use them as-is
        (Some(w), Some(h)) => (w, h),

        // If one was provided, we want to preserve the aspect ratio (and keep at least 1 pixel)
        (Some(w), None) => (w, ((w as f32 / img_ratio) as u32).max(1)),
        (None, Some(h)) => (((h as f32 * img_ratio) as u32).max(1), h),
    }
}
